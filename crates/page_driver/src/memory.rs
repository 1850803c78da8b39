//! MemoryPage — stránka v paměti nad `scraper`.
//!
//! Zdrojové HTML se nemění (kromě `replace_source`), všechno živé je
//! v overlay vrstvách: viditelnost, disabled, hodnoty inputů, odpojení.
//! Element id = pořadí elementu v dokumentu ("m17"), takže přežije i
//! výměnu zdroje se stejnou strukturou (jen jiný text).
//!
//! `scraper::Html` není `Send`, proto se parsuje při každém volání.

use crate::{ChangeSource, ElementId, ElementState, Page, PageError};
use parking_lot::Mutex;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};

/// Co se stane po kliknutí na element odpovídající selektoru
#[derive(Debug, Clone)]
pub enum Reaction {
    Show(String),
    Hide(String),
    SetValue { selector: String, value: String },
    Detach(String),
    Attach(String),
}

#[derive(Debug, Default)]
struct Overlay {
    detached: HashSet<usize>,
    hidden: HashSet<usize>,
    shown: HashSet<usize>,
    disabled: HashMap<usize, bool>,
    values: HashMap<usize, String>,
    clicks: Vec<usize>,
    inputs: Vec<(usize, String)>,
    reactions: Vec<(String, Reaction)>,
    added: Vec<ElementId>,
    observing: bool,
}

pub struct MemoryPage {
    source: Mutex<String>,
    overlay: Mutex<Overlay>,
}

impl MemoryPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            source: Mutex::new(html.into()),
            overlay: Mutex::new(Overlay::default()),
        }
    }

    /// Vymění zdroj. Overlay zůstává, id platí dokud se nezmění struktura.
    pub fn replace_source(&self, html: impl Into<String>) {
        *self.source.lock() = html.into();
    }

    pub fn on_click(&self, selector: &str, reaction: Reaction) {
        self.overlay.lock().reactions.push((selector.to_string(), reaction));
    }

    /// První element (i neviditelný) podle selektoru
    pub fn first(&self, selector: &str) -> Option<ElementId> {
        self.query_all(None, selector).ok()?.into_iter().next()
    }

    pub fn attach(&self, selector: &str) {
        let positions = self.positions_for(selector, true);
        let mut overlay = self.overlay.lock();
        for pos in positions {
            if overlay.detached.remove(&pos) && overlay.observing {
                overlay.added.push(id_for(pos));
            }
        }
    }

    pub fn detach(&self, selector: &str) {
        let positions = self.positions_for(selector, false);
        let mut overlay = self.overlay.lock();
        overlay.detached.extend(positions);
    }

    pub fn hide(&self, selector: &str) {
        let positions = self.positions_for(selector, false);
        let mut overlay = self.overlay.lock();
        for pos in positions {
            overlay.shown.remove(&pos);
            overlay.hidden.insert(pos);
        }
    }

    pub fn show(&self, selector: &str) {
        let positions = self.positions_for(selector, false);
        let mut overlay = self.overlay.lock();
        for pos in positions {
            overlay.hidden.remove(&pos);
            overlay.shown.insert(pos);
        }
    }

    pub fn set_disabled(&self, selector: &str, disabled: bool) {
        let positions = self.positions_for(selector, false);
        let mut overlay = self.overlay.lock();
        for pos in positions {
            overlay.disabled.insert(pos, disabled);
        }
    }

    /// Všechny kliky v pořadí
    pub fn clicks(&self) -> Vec<ElementId> {
        self.overlay.lock().clicks.iter().map(|p| id_for(*p)).collect()
    }

    /// Kolikrát se kliklo na elementy odpovídající selektoru
    pub fn click_count(&self, selector: &str) -> usize {
        let targets: HashSet<usize> = self.positions_for(selector, true).into_iter().collect();
        self.overlay.lock().clicks.iter().filter(|p| targets.contains(p)).count()
    }

    /// Zápisy do inputů (element, hodnota) v pořadí
    pub fn inputs(&self) -> Vec<(ElementId, String)> {
        self.overlay
            .lock()
            .inputs
            .iter()
            .map(|(p, v)| (id_for(*p), v.clone()))
            .collect()
    }

    fn positions_for(&self, selector: &str, include_detached: bool) -> Vec<usize> {
        let source = self.source.lock().clone();
        let overlay = self.overlay.lock();
        let html = Html::parse_document(&source);
        let view = View::new(&html, &overlay);
        view.select(None, selector, include_detached).unwrap_or_default()
    }

    fn with_view<T>(&self, f: impl FnOnce(&View<'_>) -> Result<T, PageError>) -> Result<T, PageError> {
        let source = self.source.lock().clone();
        let overlay = self.overlay.lock();
        let html = Html::parse_document(&source);
        let view = View::new(&html, &overlay);
        f(&view)
    }

    fn apply_reactions(&self, clicked: usize) {
        let reactions: Vec<Reaction> = {
            let source = self.source.lock().clone();
            let overlay = self.overlay.lock();
            let html = Html::parse_document(&source);
            let view = View::new(&html, &overlay);
            overlay
                .reactions
                .iter()
                .filter(|(sel, _)| view.matches(clicked, sel).unwrap_or(false))
                .map(|(_, r)| r.clone())
                .collect()
        };

        for reaction in reactions {
            match reaction {
                Reaction::Show(sel) => self.show(&sel),
                Reaction::Hide(sel) => self.hide(&sel),
                Reaction::Detach(sel) => self.detach(&sel),
                Reaction::Attach(sel) => self.attach(&sel),
                Reaction::SetValue { selector, value } => {
                    let positions = self.positions_for(&selector, false);
                    let mut overlay = self.overlay.lock();
                    for pos in positions {
                        overlay.values.insert(pos, value.clone());
                    }
                }
            }
        }
    }

    /// Pozice připojeného elementu, jinak `Detached`
    fn live_position(&self, el: &ElementId) -> Result<usize, PageError> {
        let pos = position_of(el)?;
        let attached = self.with_view(|view| Ok(view.get(pos).is_some() && view.is_attached(pos)))?;
        if attached {
            Ok(pos)
        } else {
            Err(PageError::Detached(el.clone()))
        }
    }
}

impl Page for MemoryPage {
    fn query_all(&self, scope: Option<&ElementId>, selector: &str) -> Result<Vec<ElementId>, PageError> {
        let scope = scope.map(position_of).transpose()?;
        self.with_view(|view| {
            if let Some(pos) = scope {
                if !view.is_attached(pos) {
                    return Err(PageError::Detached(id_for(pos)));
                }
            }
            Ok(view.select(scope, selector, false)?.into_iter().map(id_for).collect())
        })
    }

    fn matches(&self, el: &ElementId, selector: &str) -> Result<bool, PageError> {
        let pos = position_of(el)?;
        self.with_view(|view| view.matches(pos, selector))
    }

    fn closest(&self, el: &ElementId, selector: &str) -> Result<Option<ElementId>, PageError> {
        let pos = position_of(el)?;
        let sel = parse_selector(selector)?;
        self.with_view(|view| {
            let node = view.node(pos, el)?;
            let hit = std::iter::once(node)
                .chain(node.ancestors().filter_map(ElementRef::wrap))
                .find(|e| sel.matches(e));
            Ok(hit.and_then(|e| view.position(&e)).map(id_for))
        })
    }

    fn state(&self, el: &ElementId) -> Result<ElementState, PageError> {
        let pos = position_of(el)?;
        self.with_view(|view| {
            if view.get(pos).is_none() || !view.is_attached(pos) {
                return Ok(ElementState::DETACHED);
            }
            Ok(ElementState {
                attached: true,
                visible: view.is_visible(pos),
                enabled: !view.is_disabled(pos),
            })
        })
    }

    fn text(&self, el: &ElementId) -> Result<String, PageError> {
        let pos = position_of(el)?;
        self.with_view(|view| Ok(view.node(pos, el)?.text().collect::<String>()))
    }

    fn outer_html(&self, el: &ElementId) -> Result<String, PageError> {
        let pos = position_of(el)?;
        self.with_view(|view| Ok(view.node(pos, el)?.html()))
    }

    fn attribute(&self, el: &ElementId, name: &str) -> Result<Option<String>, PageError> {
        let pos = position_of(el)?;
        self.with_view(|view| Ok(view.node(pos, el)?.value().attr(name).map(str::to_string)))
    }

    fn inline_style(&self, el: &ElementId, property: &str) -> Result<Option<String>, PageError> {
        let pos = position_of(el)?;
        self.with_view(|view| {
            let style = view.node(pos, el)?.value().attr("style").unwrap_or_default();
            Ok(style_property(style, property))
        })
    }

    fn value(&self, el: &ElementId) -> Result<String, PageError> {
        let pos = position_of(el)?;
        self.with_view(|view| {
            let node = view.node(pos, el)?;
            Ok(view
                .overlay
                .values
                .get(&pos)
                .cloned()
                .or_else(|| node.value().attr("value").map(str::to_string))
                .unwrap_or_default())
        })
    }

    fn click(&self, el: &ElementId) -> Result<(), PageError> {
        let pos = self.live_position(el)?;
        self.overlay.lock().clicks.push(pos);
        self.apply_reactions(pos);
        Ok(())
    }

    fn set_value(&self, el: &ElementId, value: &str) -> Result<(), PageError> {
        let pos = self.live_position(el)?;
        let mut overlay = self.overlay.lock();
        overlay.values.insert(pos, value.to_string());
        overlay.inputs.push((pos, value.to_string()));
        Ok(())
    }
}

impl ChangeSource for MemoryPage {
    fn observe(&self, _root_selector: &str) -> Result<(), PageError> {
        self.overlay.lock().observing = true;
        Ok(())
    }

    fn take_added(&self) -> Result<Vec<ElementId>, PageError> {
        Ok(std::mem::take(&mut self.overlay.lock().added))
    }
}

/// Pohled na jeden parse dokumentu + overlay
struct View<'a> {
    html: &'a Html,
    elements: Vec<ElementRef<'a>>,
    overlay: &'a Overlay,
}

impl<'a> View<'a> {
    fn new(html: &'a Html, overlay: &'a Overlay) -> Self {
        let elements = html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .collect();
        Self { html, elements, overlay }
    }

    fn get(&self, pos: usize) -> Option<ElementRef<'a>> {
        self.elements.get(pos).copied()
    }

    fn node(&self, pos: usize, el: &ElementId) -> Result<ElementRef<'a>, PageError> {
        self.get(pos).ok_or_else(|| PageError::Detached(el.clone()))
    }

    fn position(&self, el: &ElementRef<'a>) -> Option<usize> {
        self.elements.iter().position(|e| e == el)
    }

    /// Element i všichni předci nejsou odpojení
    fn is_attached(&self, pos: usize) -> bool {
        let Some(node) = self.get(pos) else {
            return false;
        };
        std::iter::once(node)
            .chain(node.ancestors().filter_map(ElementRef::wrap))
            .filter_map(|e| self.position(&e))
            .all(|p| !self.overlay.detached.contains(&p))
    }

    fn is_visible(&self, pos: usize) -> bool {
        let Some(node) = self.get(pos) else {
            return false;
        };
        std::iter::once(node)
            .chain(node.ancestors().filter_map(ElementRef::wrap))
            .all(|e| {
                let Some(p) = self.position(&e) else {
                    return true;
                };
                if self.overlay.hidden.contains(&p) {
                    return false;
                }
                self.overlay.shown.contains(&p) || !hidden_by_markup(&e)
            })
    }

    fn is_disabled(&self, pos: usize) -> bool {
        if let Some(d) = self.overlay.disabled.get(&pos) {
            return *d;
        }
        self.get(pos)
            .map(|e| e.value().attr("disabled").is_some())
            .unwrap_or(false)
    }

    fn matches(&self, pos: usize, selector: &str) -> Result<bool, PageError> {
        let sel = parse_selector(selector)?;
        Ok(self.get(pos).map(|e| sel.matches(&e)).unwrap_or(false))
    }

    fn select(&self, scope: Option<usize>, selector: &str, include_detached: bool) -> Result<Vec<usize>, PageError> {
        let sel = parse_selector(selector)?;
        let hits: Vec<ElementRef<'a>> = match scope {
            Some(pos) => match self.get(pos) {
                // scraper vrací i scope samotný, querySelectorAll ne
                Some(root) => root.select(&sel).filter(|e| *e != root).collect(),
                None => Vec::new(),
            },
            None => self.html.select(&sel).collect(),
        };
        Ok(hits
            .iter()
            .filter_map(|e| self.position(e))
            .filter(|p| include_detached || self.is_attached(*p))
            .collect())
    }
}

fn parse_selector(selector: &str) -> Result<Selector, PageError> {
    Selector::parse(selector).map_err(|_| PageError::Selector(selector.to_string()))
}

fn id_for(pos: usize) -> ElementId {
    ElementId::new(format!("m{pos}"))
}

fn position_of(el: &ElementId) -> Result<usize, PageError> {
    el.as_str()
        .strip_prefix('m')
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| PageError::Detached(el.clone()))
}

fn hidden_by_markup(e: &ElementRef<'_>) -> bool {
    if e.value().attr("hidden").is_some() {
        return true;
    }
    let style = e.value().attr("style").unwrap_or_default();
    matches!(style_property(style, "display").as_deref(), Some("none"))
        || matches!(style_property(style, "visibility").as_deref(), Some("hidden"))
        || matches!(style_property(style, "opacity").as_deref(), Some("0"))
}

fn style_property(style: &str, property: &str) -> Option<String> {
    style.split(';').find_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        (name.trim().eq_ignore_ascii_case(property)).then(|| value.trim().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
        <div id="dialog">
          <p class="title">Who wins?</p>
          <button id="toggle">Custom</button>
          <div id="custom" hidden>
            <input type="number" id="amount" max="500">
            <button id="max">Max</button>
          </div>
        </div>
        <div id="later"><span class="inner">late</span></div>"#;

    #[test]
    fn hidden_subtree_is_not_visible_until_shown() {
        let page = MemoryPage::new(DOC);
        let amount = page.first("#amount").unwrap();
        assert!(!page.state(&amount).unwrap().visible);
        page.show("#custom");
        assert!(page.state(&amount).unwrap().usable());
    }

    #[test]
    fn click_reactions_reveal_and_fill() {
        let page = MemoryPage::new(DOC);
        page.on_click("#toggle", Reaction::Show("#custom".into()));
        page.on_click("#max", Reaction::SetValue { selector: "#amount".into(), value: "500".into() });

        page.click(&page.first("#toggle").unwrap()).unwrap();
        page.click(&page.first("#max").unwrap()).unwrap();

        let amount = page.first("#amount").unwrap();
        assert!(page.state(&amount).unwrap().visible);
        assert_eq!(page.value(&amount).unwrap(), "500");
        assert_eq!(page.click_count("#toggle"), 1);
    }

    #[test]
    fn scoped_query_excludes_scope_itself() {
        let page = MemoryPage::new(DOC);
        let dialog = page.first("#dialog").unwrap();
        let divs = page.query_all(Some(&dialog), "div").unwrap();
        assert_eq!(divs.len(), 1);
        assert_eq!(page.attribute(&divs[0], "id").unwrap().as_deref(), Some("custom"));
    }

    #[test]
    fn detached_elements_vanish_and_reject_interaction() {
        let page = MemoryPage::new(DOC);
        let toggle = page.first("#toggle").unwrap();
        page.detach("#dialog");
        assert!(page.first("#toggle").is_none());
        assert_eq!(page.state(&toggle).unwrap(), ElementState::DETACHED);
        assert!(matches!(page.click(&toggle), Err(PageError::Detached(_))));
    }

    #[test]
    fn attach_is_reported_while_observing() {
        let page = MemoryPage::new(DOC);
        page.detach("#later");
        page.observe("html").unwrap();
        page.attach("#later");
        let added = page.take_added().unwrap();
        assert_eq!(added, vec![page.first("#later").unwrap()]);
        assert!(page.take_added().unwrap().is_empty());
    }

    #[test]
    fn closest_walks_up() {
        let page = MemoryPage::new(DOC);
        let inner = page.first(".inner").unwrap();
        assert_eq!(page.closest(&inner, "#later").unwrap(), page.first("#later"));
        assert_eq!(page.closest(&inner, "span").unwrap(), Some(inner));
    }

    #[test]
    fn replace_source_keeps_ids_for_same_structure() {
        let page = MemoryPage::new(r#"<div id="t"><span>0:45</span></div>"#);
        let span = page.first("#t span").unwrap();
        page.replace_source(r#"<div id="t"><span>0:09</span></div>"#);
        assert_eq!(page.text(&span).unwrap(), "0:09");
    }

    #[test]
    fn inline_style_lookup() {
        let page = MemoryPage::new(r#"<div id="c" style="background-color: rgb(56, 122, 255); color:red"></div>"#);
        let c = page.first("#c").unwrap();
        assert_eq!(page.inline_style(&c, "background-color").unwrap().as_deref(), Some("rgb(56, 122, 255)"));
        assert_eq!(page.inline_style(&c, "border").unwrap(), None);
    }
}
