//! Built-in starting lists for every mode, used before any update arrives.

use crate::dto::{
    admin::RankingsByMode,
    rankings::{Entity, Mode},
};

/// Mode a fresh display shows until its first accepted update.
pub const INITIAL_MODE: Mode = Mode::EConsole;

/// Seed list for one mode.
pub fn initial_list(mode: Mode) -> Vec<Entity> {
    let (prefix, header, countries): (&str, Option<&str>, &[(&str, &str)]) = match mode {
        Mode::RocketLeague => (
            "rl",
            None,
            &[
                ("Morocco", "ma"),
                ("Australia", "au"),
                ("France", "fr"),
                ("Malaysia", "my"),
                ("England", "gb-eng"),
                ("Belgium", "be"),
                ("South Africa", "za"),
                ("Netherlands", "nl"),
                ("Saudi Arabia", "sa"),
                ("Oman", "om"),
                ("USA", "us"),
                ("Brazil", "br"),
                ("Chile", "cl"),
                ("Germany", "de"),
                ("Italy", "it"),
                ("Norway", "no"),
            ],
        ),
        Mode::EConsole => (
            "ec",
            None,
            &[
                ("Saudi Arabia", "sa"),
                ("Italy", "it"),
                ("Brazil", "br"),
                ("Chile", "cl"),
                ("Thailand", "th"),
                ("Türkiye", "tr"),
                ("Morocco", "ma"),
                ("Jordan", "jo"),
                ("Japan", "jp"),
                ("Poland", "pl"),
                ("Indonesia", "id"),
                ("Mexico", "mx"),
            ],
        ),
        Mode::EMobile => (
            "em",
            None,
            &[
                ("Türkiye", "tr"),
                ("Japan", "jp"),
                ("Morocco", "ma"),
                ("India", "in"),
                ("Colombia", "co"),
                ("Greece", "gr"),
                ("Saudi Arabia", "sa"),
                ("Bahrain", "bh"),
                ("Brazil", "br"),
                ("Thailand", "th"),
                ("Egypt", "eg"),
                ("Malaysia", "my"),
            ],
        ),
        Mode::EConsoleGroupA => (
            "ecga",
            Some("GROUP A"),
            &[
                ("Saudi Arabia", "sa"),
                ("Italy", "it"),
                ("Brazil", "br"),
                ("Chile", "cl"),
                ("Thailand", "th"),
                ("Türkiye", "tr"),
            ],
        ),
        Mode::EConsoleGroupB => (
            "ecgb",
            Some("GROUP B"),
            &[
                ("Morocco", "ma"),
                ("Jordan", "jo"),
                ("Japan", "jp"),
                ("Poland", "pl"),
                ("Indonesia", "id"),
                ("Mexico", "mx"),
            ],
        ),
        Mode::EMobileGroupA => (
            "emga",
            Some("GROUP A"),
            &[
                ("Saudi Arabia", "sa"),
                ("Bahrain", "bh"),
                ("Brazil", "br"),
                ("Thailand", "th"),
                ("Egypt", "eg"),
                ("Malaysia", "my"),
            ],
        ),
        Mode::EMobileGroupB => (
            "emgb",
            Some("GROUP B"),
            &[
                ("Türkiye", "tr"),
                ("Japan", "jp"),
                ("Morocco", "ma"),
                ("India", "in"),
                ("Colombia", "co"),
                ("Greece", "gr"),
            ],
        ),
    };

    let header = header.map(|name| Entity::header(format!("{prefix}-header"), name));
    let rows = countries.iter().zip(1..).map(|((name, iso), rank)| {
        Entity::ranked(format!("{prefix}-{rank}"), *name, *iso, rank)
    });

    header.into_iter().chain(rows).collect()
}

/// Seed lists for every mode, in [`Mode::ALL`] order.
pub fn initial_rankings() -> RankingsByMode {
    Mode::ALL
        .into_iter()
        .map(|mode| (mode, initial_list(mode)))
        .collect()
}
