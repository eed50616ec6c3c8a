//! Guest-language sources for the haversine distance function.
//!
//! Each fragment evaluates to a callable taking `(a_lat, a_long, b_lat,
//! b_long)` in degrees and returning kilometres.

use std::fmt;

use crate::error::UsageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Js,
    Ruby,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Js, Language::Ruby];

    /// Resolves a language tag. Tags are matched by prefix, so `js-strict`
    /// selects JavaScript and `ruby3` selects Ruby.
    pub fn from_tag(tag: &str) -> Result<Self, UsageError> {
        if tag.starts_with("js") {
            Ok(Language::Js)
        } else if tag.starts_with("ruby") {
            Ok(Language::Ruby)
        } else {
            Err(UsageError::UnsupportedLanguage(tag.to_string()))
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Language::Js => "js",
            Language::Ruby => "ruby",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFragment {
    pub language: Language,
    pub source: &'static str,
}

pub fn fragment_for(language: Language) -> SourceFragment {
    let source = match language {
        Language::Js => JS_HAVERSINE_DISTANCE,
        Language::Ruby => RUBY_HAVERSINE_DISTANCE,
    };
    SourceFragment { language, source }
}

pub const JS_HAVERSINE_DISTANCE: &str = "(a_lat, a_long, b_lat, b_long) => {
    const EARTH_RADIUS = 6371;
    const a_lat_radians = a_lat * Math.PI / 180;
    const a_long_radians = a_long * Math.PI / 180;
    const b_lat_radians = b_lat * Math.PI / 180;
    const b_long_radians = b_long * Math.PI / 180;
    const angular_distance = Math.acos(
        Math.sin(a_lat_radians) * Math.sin(b_lat_radians) +
        Math.cos(a_lat_radians) * Math.cos(b_lat_radians) *
        Math.cos(a_long_radians - b_long_radians));
    return EARTH_RADIUS * angular_distance;
}";

// The constant lives in the context, so re-evaluating the fragment must not
// redefine it.
pub const RUBY_HAVERSINE_DISTANCE: &str = "EARTH_RADIUS = 6371 unless defined?(EARTH_RADIUS)
->(a_lat, a_long, b_lat, b_long) do
    a_lat_radians = a_lat * Math::PI / 180
    a_long_radians = a_long * Math::PI / 180
    b_lat_radians = b_lat * Math::PI / 180
    b_long_radians = b_long * Math::PI / 180
    angular_distance = Math::acos(
        Math::sin(a_lat_radians) * Math::sin(b_lat_radians) +
        Math::cos(a_lat_radians) * Math::cos(b_lat_radians) *
        Math::cos(a_long_radians - b_long_radians))
    EARTH_RADIUS * angular_distance
end";

#[cfg(test)]
#[path = "scripts_test.rs"]
mod scripts_test;
