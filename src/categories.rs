//! Upstream category table and the visibility rules for the category screen.
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

pub const FIRST_YEAR: i32 = 1980;

#[derive(Debug, Clone, Copy)]
pub struct CategoryDef {
    pub key: &'static str,
    pub slug: &'static str,
    pub title: &'static str,
}

/// Fixed categories in menu order.
pub const CATEGORIES: &[CategoryDef] = &[
    CategoryDef {
        key: "legends",
        slug: "legends_id",
        title: "Топ фильмы",
    },
    CategoryDef {
        key: "k4_new",
        slug: "lampac_movies_4k_new",
        title: "В высоком качестве (новые)",
    },
    CategoryDef {
        key: "movies_new",
        slug: "lampac_movies_new",
        title: "Новые фильмы",
    },
    CategoryDef {
        key: "russian_new_movies",
        slug: "lampac_movies_ru_new",
        title: "Новые русские фильмы",
    },
    CategoryDef {
        key: "all_tv",
        slug: "lampac_all_tv_shows",
        title: "Сериалы",
    },
    CategoryDef {
        key: "russian_tv",
        slug: "lampac_all_tv_shows_ru",
        title: "Русские сериалы",
    },
    CategoryDef {
        key: "cartoons",
        slug: "lampac_all_cartoon_movies",
        title: "Мультфильмы",
    },
    CategoryDef {
        key: "k4",
        slug: "lampac_movies_4k",
        title: "В высоком качестве",
    },
    CategoryDef {
        key: "movies",
        slug: "lampac_movies",
        title: "Фильмы",
    },
    CategoryDef {
        key: "russian_movies",
        slug: "lampac_movies_ru",
        title: "Русские фильмы",
    },
    CategoryDef {
        key: "cartoons_tv",
        slug: "lampac_all_cartoon_series",
        title: "Мультсериалы",
    },
    CategoryDef {
        key: "anime",
        slug: "anime_id",
        title: "Аниме",
    },
];

/// Default category for a bare list request.
pub const DEFAULT_SLUG: &str = "lampac_movies_new";

#[derive(Debug, Clone, Copy)]
pub struct YearGroup {
    pub key: &'static str,
    pub start: i32,
    /// `None` runs up to the current year.
    pub end: Option<i32>,
    pub default_visible: bool,
}

pub const YEAR_GROUPS: &[YearGroup] = &[
    YearGroup {
        key: "year_1980_1989",
        start: 1980,
        end: Some(1989),
        default_visible: false,
    },
    YearGroup {
        key: "year_1990_1999",
        start: 1990,
        end: Some(1999),
        default_visible: false,
    },
    YearGroup {
        key: "year_2000_2009",
        start: 2000,
        end: Some(2009),
        default_visible: false,
    },
    YearGroup {
        key: "year_2010_2019",
        start: 2010,
        end: Some(2019),
        default_visible: true,
    },
    YearGroup {
        key: "year_2020_current",
        start: 2020,
        end: None,
        default_visible: true,
    },
];

static BY_KEY: Lazy<HashMap<&'static str, &'static CategoryDef>> =
    Lazy::new(|| CATEGORIES.iter().map(|c| (c.key, c)).collect());

pub fn find(key: &str) -> Option<&'static CategoryDef> {
    BY_KEY.get(key).copied()
}

pub fn year_slug(year: i32) -> String {
    format!("movies_id_{year}")
}

/// Resolves a category key to its section; anything else is taken as a raw upstream slug.
pub fn section_for(name: &str) -> SectionRef {
    match find(name) {
        Some(def) => SectionRef {
            slug: def.slug.to_string(),
            title: def.title.to_string(),
        },
        None => SectionRef {
            slug: name.to_string(),
            title: name.to_string(),
        },
    }
}

/// Per-key visibility overrides on top of the built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct CategoryVisibility {
    overrides: HashMap<String, bool>,
}

impl CategoryVisibility {
    pub fn set(&mut self, key: &str, visible: bool) {
        self.overrides.insert(key.to_string(), visible);
    }

    pub fn is_visible(&self, key: &str) -> bool {
        if let Some(v) = self.overrides.get(key) {
            return *v;
        }
        YEAR_GROUPS
            .iter()
            .find(|g| g.key == key)
            .map(|g| g.default_visible)
            .unwrap_or(true)
    }

    pub fn year_visible(&self, year: i32, current_year: i32) -> bool {
        YEAR_GROUPS
            .iter()
            .find(|g| year >= g.start && year <= g.end.unwrap_or(current_year))
            .map(|g| self.is_visible(g.key))
            .unwrap_or(false)
    }
}

/// One requestable section of the category screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionRef {
    pub slug: String,
    pub title: String,
}

/// Visible sections in display order: fixed categories, then years newest first.
pub fn visible_sections(visibility: &CategoryVisibility, current_year: i32) -> Vec<SectionRef> {
    let fixed = CATEGORIES
        .iter()
        .filter(|c| visibility.is_visible(c.key))
        .map(|c| SectionRef {
            slug: c.slug.to_string(),
            title: c.title.to_string(),
        });
    let years = (FIRST_YEAR..=current_year)
        .rev()
        .filter(|y| visibility.year_visible(*y, current_year))
        .map(|y| SectionRef {
            slug: year_slug(y),
            title: format!("Фильмы {y} года"),
        });
    fixed.chain(years).collect()
}
