//! Internationalization (i18n) module.
//!
//! Notice texts are embedded JSON catalogues keyed by dotted paths,
//! e.g. `"flood.muted_for_spam"`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::guard::Notice;

/// LangCode -> catalogue
static TRANSLATIONS: Lazy<HashMap<String, Value>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (lang, raw) in [("en", include_str!("en.json")), ("id", include_str!("id.json"))] {
        match serde_json::from_str(raw) {
            Ok(val) => {
                map.insert(lang.to_string(), val);
            }
            Err(e) => tracing::error!("Broken {} catalogue: {}", lang, e),
        }
    }
    map
});

/// Force catalogue parsing at startup so errors surface early.
pub fn init() {
    Lazy::force(&TRANSLATIONS);
}

/// Get text for a key, falling back to English and then to the key itself.
pub fn get_text(lang: &str, key: &str) -> String {
    [lang, "en"]
        .iter()
        .filter_map(|l| TRANSLATIONS.get(*l))
        .find_map(|val| resolve_key(val, key))
        .unwrap_or_else(|| key.to_string())
}

fn resolve_key(val: &Value, key: &str) -> Option<String> {
    key.split('.')
        .try_fold(val, |current, part| current.get(part))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Catalogue key for a notice.
pub fn notice_key(notice: Notice) -> &'static str {
    match notice {
        Notice::AlreadyMuted => "flood.already_muted",
        Notice::MutedForSpam => "flood.muted_for_spam",
        Notice::UnmutedExpired => "flood.unmuted",
        Notice::MuteRefreshedOnLogin => "flood.mute_refreshed",
    }
}
