//! Outcome Analyzer — čte procenta, body a zbývající čas z predikčního dialogu.
//!
//! Všechno je čisté čtení. Stránka dodá outer HTML (dialog, sloupce),
//! parsuje se přes scraper. Co nejde najít nebo přečíst, je `None`.

use crate::selectors::{
    OUTCOME_COLUMN, OUTCOME_PERCENT, POINTS_ATTRIBUTES, POINTS_STATS, POINTS_TEXT_NODES, TIMERS,
    TIMER_FALLBACK_NODES,
};
use page_driver::{finder, ElementId, Page};
use regex::{Captures, Regex};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::sync::LazyLock;

/// Kolik obecných elementů max projít při hledání odpočtu
pub const TIMER_SCAN_CAP: usize = 160;

const POINT_KEYWORDS: &[&str] = &["point", "points", "channel points", "prediction"];
const TIMER_KEYWORDS: &[&str] = &["closing", "closes", "close in", "closes in", "lock in", "closing in"];

static PERCENT_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(\d{1,3})\s*%").ok());
static POINTS_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:[.,\s]\d+)?)(?:\s*([kmb]))?").ok());
static PARENS_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\(.*?\)").ok());

static MM_SS_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(\d+)\s*:\s*(\d{2})").ok());
static M_S_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*m\s*(\d+)\s*s").ok());
static MIN_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*m(in(ute)?s?)?").ok());
static SEC_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(seconds?|sec|s)").ok());

static LOCKED_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b(locked|closed)\b|\b0:00\b").ok());

/// Signály jedné strany
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SideSignal {
    /// 0..=100
    pub percent: Option<u32>,
    pub points: Option<u64>,
}

/// Co dialog právě ukazuje. Počítá se znovu při každém vyhodnocení.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct OutcomeSnapshot {
    pub blue: SideSignal,
    pub pink: SideSignal,
    pub remaining_sec: Option<u32>,
}

impl OutcomeSnapshot {
    /// Prohodí strany (pro testy symetrie strategie)
    pub fn swapped(&self) -> Self {
        Self { blue: self.pink, pink: self.blue, remaining_sec: self.remaining_sec }
    }
}

/// Kompletní snímek dialogu. První viditelný sloupec = modrá, druhý = růžová.
pub fn analyze(page: &dyn Page, dialog: &ElementId) -> OutcomeSnapshot {
    let columns = finder::all_visible(page, Some(dialog), OUTCOME_COLUMN);
    let side = |idx: usize| {
        columns
            .get(idx)
            .and_then(|col| page.outer_html(col).ok())
            .map(|html| side_signal(&html))
            .unwrap_or_default()
    };

    OutcomeSnapshot {
        blue: side(0),
        pink: side(1),
        remaining_sec: remaining(page, dialog),
    }
}

/// Jen zbývající čas (gate v enginu nepotřebuje zbytek)
pub fn remaining(page: &dyn Page, dialog: &ElementId) -> Option<u32> {
    let html = page.outer_html(dialog).ok()?;
    remaining_seconds(&html)
}

/// Text dialogu hlásí, že sázky jsou zavřené
pub fn is_locked(dialog_text: &str) -> bool {
    LOCKED_RE
        .as_ref()
        .map(|re| re.is_match(dialog_text))
        .unwrap_or(false)
}

/// Procenta a body z outer HTML jednoho sloupce
pub fn side_signal(column_html: &str) -> SideSignal {
    let doc = Html::parse_fragment(column_html);
    let Some(col) = fragment_root(&doc) else {
        return SideSignal::default();
    };
    SideSignal {
        percent: column_percent(col),
        points: column_points(col),
    }
}

fn column_percent(col: ElementRef<'_>) -> Option<u32> {
    let sel = selector(OUTCOME_PERCENT)?;
    let el = descendants(col, &sel).next()?;
    let text = el.text().collect::<String>();
    let caps = PERCENT_RE.as_ref()?.captures(&text)?;
    let pct = num::<u32>(&caps, 1)?;
    (pct <= 100).then_some(pct)
}

/// Vrstvený odhad bodů: data atributy → statistiky → texty s klíčovým slovem
/// nebo číslem ≥10. Bere se maximum ze všech kandidátů.
fn column_points(col: ElementRef<'_>) -> Option<u64> {
    let mut candidates = Vec::new();

    for attr in POINTS_ATTRIBUTES {
        if let Some(v) = col.value().attr(attr).and_then(parse_points_value) {
            candidates.push(v);
        }
    }

    for raw in POINTS_STATS {
        let Some(sel) = selector(raw) else { continue };
        let Some(el) = descendants(col, &sel).next() else { continue };
        if let Some(v) = parse_points_value(&el.text().collect::<String>()) {
            candidates.push(v);
        }
    }

    if let Some(sel) = selector(POINTS_TEXT_NODES) {
        for el in descendants(col, &sel) {
            let text = el.text().collect::<String>();
            let text = text.trim();
            if text.is_empty() || text.contains('%') {
                continue;
            }
            let Some(v) = parse_points_value(text) else { continue };
            let lower = text.to_lowercase();
            if v >= 10 || POINT_KEYWORDS.iter().any(|k| lower.contains(k)) {
                candidates.push(v);
            }
        }
    }

    candidates.into_iter().max()
}

/// Odpočet: nejdřív určené timer elementy, pak max `TIMER_SCAN_CAP`
/// obecných elementů s klíčovým slovem o uzávěrce
pub fn remaining_seconds(dialog_html: &str) -> Option<u32> {
    let doc = Html::parse_fragment(dialog_html);
    let root = fragment_root(&doc)?;

    for raw in TIMERS {
        let Some(sel) = selector(raw) else { continue };
        let Some(el) = descendants(root, &sel).next() else { continue };
        let text = el.text().collect::<String>();
        let info = if text.is_empty() {
            el.value().attr("aria-label").unwrap_or_default().to_string()
        } else {
            text
        };
        if let Some(secs) = parse_countdown_seconds(&info) {
            return Some(secs);
        }
    }

    let sel = selector(TIMER_FALLBACK_NODES)?;
    for el in descendants(root, &sel).take(TIMER_SCAN_CAP) {
        let sources = [
            el.text().collect::<String>(),
            el.value().attr("aria-label").unwrap_or_default().to_string(),
        ];
        for raw in &sources {
            let text = raw.trim();
            if text.is_empty() || !text.chars().any(|c| c.is_ascii_digit()) {
                continue;
            }
            let lower = text.to_lowercase();
            if !TIMER_KEYWORDS.iter().any(|k| lower.contains(k)) {
                continue;
            }
            if let Some(secs) = parse_countdown_seconds(text) {
                return Some(secs);
            }
        }
    }

    None
}

/// "1.2K" → 1200, "3,400" → 3400, "2.5M points (12%)" → 2 500 000.
/// Víc čísel v textu → největší.
pub fn parse_points_value(text: &str) -> Option<u64> {
    let sanitized = text.replace(['\u{a0}', '\u{202f}'], " ");
    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        return None;
    }

    let cleaned = PARENS_RE.as_ref()?.replace_all(sanitized, " ");
    let mut best: Option<f64> = None;

    for caps in POINTS_RE.as_ref()?.captures_iter(&cleaned) {
        let Some(raw) = caps.get(1) else { continue };
        let suffix = caps.get(2).map(|m| m.as_str().to_ascii_lowercase());
        let compact: String = raw.as_str().chars().filter(|c| !c.is_whitespace()).collect();

        let (digits, mult) = match suffix.as_deref() {
            Some("k") => (compact.replacen(',', ".", 1), 1e3),
            Some("m") => (compact.replacen(',', ".", 1), 1e6),
            Some("b") => (compact.replacen(',', ".", 1), 1e9),
            _ => (compact.replace(',', ""), 1.0),
        };

        let Ok(value) = digits.parse::<f64>() else { continue };
        let total = value * mult;
        if !total.is_finite() {
            continue;
        }
        best = Some(best.map_or(total, |b| b.max(total)));
    }

    best.map(|b| b.round() as u64)
}

/// "1:30" → 90, "1m 5s" → 65, "2 minutes" → 120, "45 seconds" → 45
pub fn parse_countdown_seconds(text: &str) -> Option<u32> {
    let cleaned = text.replace(['\u{a0}', '\u{202f}'], " ");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    if let Some(caps) = MM_SS_RE.as_ref().and_then(|re| re.captures(cleaned)) {
        if let (Some(m), Some(s)) = (num::<u32>(&caps, 1), num::<u32>(&caps, 2)) {
            return Some(m.saturating_mul(60).saturating_add(s));
        }
    }
    if let Some(caps) = M_S_RE.as_ref().and_then(|re| re.captures(cleaned)) {
        if let (Some(m), Some(s)) = (num::<u32>(&caps, 1), num::<u32>(&caps, 2)) {
            return Some(m.saturating_mul(60).saturating_add(s));
        }
    }
    if let Some(caps) = MIN_RE.as_ref().and_then(|re| re.captures(cleaned)) {
        if let Some(m) = num::<u32>(&caps, 1) {
            return Some(m.saturating_mul(60));
        }
    }
    if let Some(caps) = SEC_RE.as_ref().and_then(|re| re.captures(cleaned)) {
        if let Some(s) = num::<u32>(&caps, 1) {
            return Some(s);
        }
    }
    None
}

fn num<T: std::str::FromStr>(caps: &Captures<'_>, idx: usize) -> Option<T> {
    caps.get(idx)?.as_str().parse().ok()
}

fn selector(raw: &str) -> Option<Selector> {
    Selector::parse(raw).ok()
}

/// První element fragmentu (to, co vrátil outer_html)
fn fragment_root(doc: &Html) -> Option<ElementRef<'_>> {
    doc.root_element().children().find_map(ElementRef::wrap)
}

/// Jako querySelectorAll: bez elementu samotného
fn descendants<'a, 'b>(root: ElementRef<'a>, sel: &'b Selector) -> impl Iterator<Item = ElementRef<'a>> + 'b
where
    'a: 'b,
{
    root.select(sel).filter(move |e| *e != root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_driver::MemoryPage;

    #[test]
    fn parses_points_values() {
        assert_eq!(parse_points_value("1.2K"), Some(1200));
        assert_eq!(parse_points_value("3,400"), Some(3400));
        assert_eq!(parse_points_value("2,5m"), Some(2_500_000));
        assert_eq!(parse_points_value("12\u{a0}345 points"), Some(12345));
        assert_eq!(parse_points_value("800 (1.5K total)"), Some(800));
        assert_eq!(parse_points_value("45 / 1.1k"), Some(1100));
        assert_eq!(parse_points_value(""), None);
        assert_eq!(parse_points_value("no numbers here"), None);
    }

    #[test]
    fn parses_countdowns_in_priority_order() {
        assert_eq!(parse_countdown_seconds("1:30"), Some(90));
        assert_eq!(parse_countdown_seconds("Closes in 0:07"), Some(7));
        assert_eq!(parse_countdown_seconds("1m 5s"), Some(65));
        assert_eq!(parse_countdown_seconds("2m"), Some(120));
        assert_eq!(parse_countdown_seconds("3 minutes"), Some(180));
        assert_eq!(parse_countdown_seconds("45 seconds"), Some(45));
        assert_eq!(parse_countdown_seconds("12 sec"), Some(12));
        assert_eq!(parse_countdown_seconds("soon"), None);
        assert_eq!(parse_countdown_seconds(""), None);
    }

    #[test]
    fn locked_marker_does_not_match_longer_clock() {
        assert!(is_locked("Prediction LOCKED"));
        assert!(is_locked("Submissions closed"));
        assert!(is_locked("Closes in 0:00"));
        assert!(!is_locked("Closes in 10:00"));
        assert!(!is_locked("Prediction closes in 0:30"));
    }

    #[test]
    fn side_signal_takes_max_points_candidate() {
        let html = r#"
            <div class="prediction-summary-outcome" data-points="900">
              <p data-test-selector="prediction-summary-outcome__percentage">62%</p>
              <p data-test-selector="prediction-summary-outcome__stat">1.5K</p>
              <span>3 predictors</span>
            </div>"#;
        let sig = side_signal(html);
        assert_eq!(sig.percent, Some(62));
        assert_eq!(sig.points, Some(1500));
    }

    #[test]
    fn stat_locator_counts_small_totals() {
        // "7" projde jen přes stat selektor, textová heuristika chce ≥10
        let sig = side_signal(r#"<div class="prediction-summary-outcome"><div class="user-points">7</div></div>"#);
        assert_eq!(sig.points, Some(7));
    }

    #[test]
    fn small_bare_number_needs_a_keyword() {
        let bare = side_signal(r#"<div class="prediction-summary-outcome"><span>7</span></div>"#);
        assert_eq!(bare.points, None);
        let labelled = side_signal(r#"<div class="prediction-summary-outcome"><span>7 points</span></div>"#);
        assert_eq!(labelled.points, Some(7));
    }

    #[test]
    fn timer_prefers_designated_elements_then_keywords() {
        let designated = r#"<div role="dialog">
              <span>Closes in 5:00</span>
              <p data-test-selector="prediction-timer__time-remaining">0:45</p>
            </div>"#;
        assert_eq!(remaining_seconds(designated), Some(45));

        let aria = r#"<div role="dialog"><time data-test-selector="countdown-x" aria-label="30 seconds"></time></div>"#;
        assert_eq!(remaining_seconds(aria), Some(30));

        let fallback = r#"<div role="dialog"><p>Who wins?</p><span>Closing in 1:05</span></div>"#;
        assert_eq!(remaining_seconds(fallback), Some(65));

        let none = r#"<div role="dialog"><p>Round 3</p><p>12 votes</p></div>"#;
        assert_eq!(remaining_seconds(none), None);
    }

    #[test]
    fn analyze_reads_visible_columns_in_order() {
        let page = MemoryPage::new(
            r#"<div id="dlg">
                 <div class="prediction-summary-outcome" style="display:none"><p>99999 points</p></div>
                 <div class="prediction-summary-outcome">
                   <p data-test-selector="prediction-summary-outcome__percentage">40%</p>
                   <p data-test-selector="prediction-summary-outcome__stat">2K</p>
                 </div>
                 <div class="prediction-summary-outcome">
                   <p data-test-selector="prediction-summary-outcome__percentage">60%</p>
                   <p data-test-selector="prediction-summary-outcome__stat">3K</p>
                 </div>
                 <p data-test-selector="prediction-timer__time-remaining">1:10</p>
               </div>"#,
        );
        let dlg = page.first("#dlg").unwrap();
        let snap = analyze(&page, &dlg);
        assert_eq!(snap.blue, SideSignal { percent: Some(40), points: Some(2000) });
        assert_eq!(snap.pink, SideSignal { percent: Some(60), points: Some(3000) });
        assert_eq!(snap.remaining_sec, Some(70));
    }

    #[test]
    fn analyze_empty_dialog_is_all_unknown() {
        let page = MemoryPage::new(r#"<div id="dlg"><p>Loading</p></div>"#);
        let dlg = page.first("#dlg").unwrap();
        assert_eq!(analyze(&page, &dlg), OutcomeSnapshot::default());
    }
}
