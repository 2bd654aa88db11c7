//! Static table of Korean listed companies: display name → exchange code + board.
//!
//! Discovered KR companies arrive as names from the extractor; only names in
//! this table can be turned into a quote request. Lookup is exact on the
//! trimmed name, with an ASCII case-insensitive fallback for Latin names
//! such as "NAVER" / "Naver".

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// KRX board a listing trades on. Determines the Yahoo Finance suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Board {
    Kospi,
    Kosdaq,
}

impl Board {
    pub fn yahoo_suffix(self) -> &'static str {
        match self {
            Board::Kospi => ".KS",
            Board::Kosdaq => ".KQ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listing {
    pub name: &'static str,
    pub code: &'static str,
    pub board: Board,
}

const LISTINGS: &[Listing] = &[
    Listing { name: "삼성전자", code: "005930", board: Board::Kospi },
    Listing { name: "SK하이닉스", code: "000660", board: Board::Kospi },
    Listing { name: "현대차", code: "005380", board: Board::Kospi },
    Listing { name: "NAVER", code: "035420", board: Board::Kospi },
    Listing { name: "카카오", code: "035720", board: Board::Kospi },
    Listing { name: "LG에너지솔루션", code: "373220", board: Board::Kospi },
    Listing { name: "삼성바이오로직스", code: "207940", board: Board::Kospi },
    Listing { name: "기아", code: "000270", board: Board::Kospi },
    Listing { name: "셀트리온", code: "068270", board: Board::Kospi },
    Listing { name: "POSCO홀딩스", code: "005490", board: Board::Kospi },
    Listing { name: "KB금융", code: "105560", board: Board::Kospi },
    Listing { name: "신한지주", code: "055550", board: Board::Kospi },
    Listing { name: "삼성SDI", code: "006400", board: Board::Kospi },
    Listing { name: "LG화학", code: "051910", board: Board::Kospi },
    Listing { name: "현대모비스", code: "012330", board: Board::Kospi },
    Listing { name: "카카오뱅크", code: "323410", board: Board::Kospi },
    Listing { name: "한화에어로스페이스", code: "012450", board: Board::Kospi },
    Listing { name: "삼성물산", code: "028260", board: Board::Kospi },
    Listing { name: "HD현대중공업", code: "329180", board: Board::Kospi },
    Listing { name: "두산에너빌리티", code: "034020", board: Board::Kospi },
    Listing { name: "SK이노베이션", code: "096770", board: Board::Kospi },
    Listing { name: "한미반도체", code: "042700", board: Board::Kospi },
    Listing { name: "크래프톤", code: "259960", board: Board::Kospi },
    Listing { name: "LG전자", code: "066570", board: Board::Kospi },
    Listing { name: "SK텔레콤", code: "017670", board: Board::Kospi },
    Listing { name: "KT", code: "030200", board: Board::Kospi },
    Listing { name: "삼성전기", code: "009150", board: Board::Kospi },
    Listing { name: "하이브", code: "352820", board: Board::Kospi },
    Listing { name: "에코프로비엠", code: "247540", board: Board::Kosdaq },
    Listing { name: "에코프로", code: "086520", board: Board::Kosdaq },
    Listing { name: "알테오젠", code: "196170", board: Board::Kosdaq },
];

static BY_NAME: Lazy<HashMap<&'static str, &'static Listing>> =
    Lazy::new(|| LISTINGS.iter().map(|l| (l.name, l)).collect());

static BY_CODE: Lazy<HashMap<&'static str, &'static Listing>> =
    Lazy::new(|| LISTINGS.iter().map(|l| (l.code, l)).collect());

/// Resolve a company display name to its listing.
pub fn by_name(name: &str) -> Option<&'static Listing> {
    let name = name.trim();
    if let Some(l) = BY_NAME.get(name) {
        return Some(l);
    }
    LISTINGS.iter().find(|l| l.name.eq_ignore_ascii_case(name))
}

/// Reverse lookup by 6-digit code.
pub fn by_code(code: &str) -> Option<&'static Listing> {
    BY_CODE.get(code.trim()).copied()
}

/// Yahoo Finance symbol for a KR code (`005930` → `005930.KS`).
/// Unknown codes default to the KOSPI suffix.
pub fn yahoo_symbol(code: &str) -> String {
    let board = by_code(code).map(|l| l.board).unwrap_or(Board::Kospi);
    format!("{}{}", code.trim(), board.yahoo_suffix())
}
