//! Element Finder — bezstavové hledání přes seřazená pravidla.
//!
//! "Nenalezeno" je normální stav. Chyby stránky se logují na debug
//! a chovají se jako nenalezeno.

use crate::{ElementId, Page};
use tracing::debug;

/// První viditelný a povolený element. Pravidla se zkouší v pořadí,
/// v rámci pravidla vyhrává první použitelná shoda.
pub fn first_usable(page: &dyn Page, scope: Option<&ElementId>, selectors: &[&str]) -> Option<ElementId> {
    selectors.iter().find_map(|sel| {
        query(page, scope, sel)
            .into_iter()
            .find(|el| is_usable(page, el))
    })
}

/// První existující shoda v pořadí pravidel (bez kontroly viditelnosti)
pub fn first_present(page: &dyn Page, scope: Option<&ElementId>, selectors: &[&str]) -> Option<ElementId> {
    selectors
        .iter()
        .find_map(|sel| query(page, scope, sel).into_iter().next())
}

/// První viditelná shoda (může být disabled)
pub fn first_visible(page: &dyn Page, scope: Option<&ElementId>, selectors: &[&str]) -> Option<ElementId> {
    selectors.iter().find_map(|sel| {
        query(page, scope, sel)
            .into_iter()
            .find(|el| is_visible(page, el))
    })
}

pub fn all_visible(page: &dyn Page, scope: Option<&ElementId>, selector: &str) -> Vec<ElementId> {
    query(page, scope, selector)
        .into_iter()
        .filter(|el| is_visible(page, el))
        .collect()
}

pub fn is_usable(page: &dyn Page, el: &ElementId) -> bool {
    page.state(el).map(|s| s.usable()).unwrap_or(false)
}

pub fn is_visible(page: &dyn Page, el: &ElementId) -> bool {
    page.state(el).map(|s| s.attached && s.visible).unwrap_or(false)
}

/// Element sám odpovídá selektoru nebo ho obsahuje: první viditelný kandidát.
/// Používá se na dávky z change notifikací.
pub fn self_or_descendant(page: &dyn Page, el: &ElementId, selector: &str) -> Option<ElementId> {
    if page.matches(el, selector).unwrap_or(false) {
        return Some(el.clone());
    }
    query(page, Some(el), selector).into_iter().next()
}

fn query(page: &dyn Page, scope: Option<&ElementId>, selector: &str) -> Vec<ElementId> {
    match page.query_all(scope, selector) {
        Ok(found) => found,
        Err(e) => {
            debug!(selector, "query failed: {}", e);
            Vec::new()
        }
    }
}
