use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use crate::extract::ConnectionRecord;

const NATIONS: &[&str] = &[
    "united kingdom", "uk", "g.b.", "gb",
    "england", "scotland", "wales", "northern ireland",
];

const METROS: &[&str] = &[
    "greater london", "greater manchester", "greater birmingham",
    "greater glasgow", "greater liverpool", "greater leeds",
];

const COUNTIES: &[&str] = &[
    "west midlands", "west yorkshire", "south yorkshire", "merseyside",
    "tyne and wear", "kent", "surrey", "essex",
    "lancashire", "cheshire", "staffordshire", "leicestershire",
    "cambridgeshire", "buckinghamshire", "oxfordshire", "berkshire",
    "norfolk", "suffolk", "lincolnshire", "hampshire", "dorset",
    "somerset", "devon", "cornwall", "durham", "north yorkshire",
    "cumbria", "nottinghamshire", "derbyshire", "gloucestershire",
    "northamptonshire", "bedfordshire", "hertfordshire", "warwickshire",
    "worcestershire", "shropshire", "rutland", "isle of wight",
    "ceredigion", "powys", "gwynedd", "flintshire", "conwy", "monmouthshire",
];

const CITIES: &[&str] = &[
    "london", "birmingham", "manchester", "liverpool", "leeds",
    "sheffield", "bristol", "glasgow", "edinburgh", "cardiff",
    "belfast", "aberdeen", "newcastle upon tyne", "nottingham",
    "leicester", "coventry", "swansea", "portsmouth", "southampton",
    "oxford", "cambridge", "york", "norwich", "bath", "exeter",
    "reading", "milton keynes", "luton", "wolverhampton", "derby",
    "plymouth", "stoke-on-trent",
];

/// Lines that describe the relationship rather than a place.
const NOISE_PREFIXES: &[&str] = &[
    "member’s",
    "member's",
    "member’s name",
    "member’s occupation",
    "connected",
];

static UK_RE: LazyLock<Regex> = LazyLock::new(|| {
    let mut keywords: Vec<&str> = NATIONS
        .iter()
        .chain(METROS)
        .chain(COUNTIES)
        .chain(CITIES)
        .copied()
        .collect();
    keywords.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    keywords.dedup();
    let alternation = keywords
        .iter()
        .map(|k| {
            // A keyword ending in a dot closes on `\B`, not `\b`.
            let end = if k.ends_with(|c: char| c.is_alphanumeric()) { r"\b" } else { r"\B" };
            format!("{}{}", regex::escape(k), end)
        })
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})", alternation)).unwrap()
});

/// Drop blank and noise lines, then flatten to one lower-case line.
pub fn clean_location(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| {
            let lower = l.to_lowercase();
            !NOISE_PREFIXES.iter().any(|p| lower.starts_with(p))
        })
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn is_uk(location: &str) -> bool {
    UK_RE.is_match(&clean_location(location))
}

/// Split records into (UK, everything else), keeping display order.
pub fn partition_uk(records: Vec<ConnectionRecord>) -> (Vec<ConnectionRecord>, Vec<ConnectionRecord>) {
    let (uk, other): (Vec<_>, Vec<_>) = records.into_iter().partition(|r| is_uk(&r.location));
    info!("Filtered {} UK-based connections ({} elsewhere)", uk.len(), other.len());
    (uk, other)
}
