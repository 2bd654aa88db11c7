// src/render.rs
//! Plain-text rendering of a [`BriefingDocument`].
//!
//! Output is deterministic for a given document: fixed section order, empty
//! sections omitted, direction shown by a marker and magnitudes unsigned.

use std::fmt::{self, Write as _};

use crate::ingest::truncate_chars;
use crate::model::{kst, BriefingDocument, Market, MarketSection, NewsItem, Quote, Rating};

pub const UP: char = '▲';
pub const DOWN: char = '▼';
pub const FLAT: char = '─';

/// Free-text fields (search-result bodies) are cut to this many chars.
pub const CONTENT_MAX_CHARS: usize = 300;

pub const RATINGS_LEGEND: &str = "(1=강력매도 · 2=매도 · 3=보유 · 4=매수 · 5=강력매수)";

/// Run of consecutive items sharing a key.
#[derive(Debug, PartialEq)]
pub struct Group<'a, K, T> {
    pub key: K,
    pub items: Vec<&'a T>,
}

/// Group consecutive items by `key`; a new group starts whenever the key
/// changes. A key that reappears later opens a new group.
pub fn group_on_change<'a, T, K, F>(items: &'a [T], key: F) -> Vec<Group<'a, K, T>>
where
    K: PartialEq,
    F: Fn(&'a T) -> K,
{
    let mut groups: Vec<Group<'a, K, T>> = Vec::new();
    for it in items {
        let k = key(it);
        match groups.last_mut() {
            Some(g) if g.key == k => g.items.push(it),
            _ => groups.push(Group {
                key: k,
                items: vec![it],
            }),
        }
    }
    groups
}

pub fn marker(value: f64) -> char {
    if value > 0.0 {
        UP
    } else if value < 0.0 {
        DOWN
    } else {
        FLAT
    }
}

/// `▲1.23%`, `▼1.23%`, `─0.00%`.
pub fn fmt_pct(pct: f64) -> String {
    format!("{}{:.2}%", marker(pct), pct.abs())
}

/// Thousands-separated number with a fixed number of decimals.
pub fn fmt_number(x: f64, decimals: usize) -> String {
    let s = format!("{:.*}", decimals, x.abs());
    let (int_part, frac) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let negative = x < 0.0 && s.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(f) = frac {
        out.push('.');
        out.push_str(f);
    }
    out
}

fn price_decimals(market: Market) -> usize {
    match market {
        Market::Kr => 0,
        Market::Us => 2,
    }
}

fn fmt_change_suffix(pct: Option<f64>) -> String {
    pct.map(|p| format!(" {}", fmt_pct(p))).unwrap_or_default()
}

fn write_quotes(out: &mut String, title: &str, quotes: &[&Quote], market: Market) -> fmt::Result {
    if quotes.is_empty() {
        return Ok(());
    }
    writeln!(out, "\n[{title}]")?;
    for q in quotes {
        writeln!(
            out,
            "- {} ({}): {}{}",
            q.display_name,
            q.identifier,
            fmt_number(q.close, price_decimals(market)),
            fmt_change_suffix(q.change_pct)
        )?;
    }
    Ok(())
}

fn write_market(out: &mut String, label: &str, m: &MarketSection, market: Market) -> fmt::Result {
    if !m.indices.is_empty() {
        writeln!(out, "\n[{label} 지수]")?;
        for ix in &m.indices {
            writeln!(
                out,
                "- {}: {}{}",
                ix.name,
                fmt_number(ix.close, 2),
                fmt_change_suffix(ix.change_pct)
            )?;
        }
    }
    let fixed: Vec<&Quote> = m.fixed_holdings().collect();
    write_quotes(out, &format!("{label} 주요 종목"), &fixed, market)?;
    let discovered: Vec<&Quote> = m.discovered_holdings().collect();
    write_quotes(out, &format!("{label} 발견 종목"), &discovered, market)
}

fn write_leaders(out: &mut String, m: &MarketSection) -> fmt::Result {
    if !m.investor_flow.is_empty() {
        writeln!(out, "\n[투자자별 순매수]")?;
        for f in &m.investor_flow {
            writeln!(
                out,
                "- {}: {}{}원",
                f.investor,
                marker(f.net_buy as f64),
                fmt_number(f.net_buy.unsigned_abs() as f64, 0)
            )?;
        }
    }
    let gainers: Vec<&Quote> = m.gainers.iter().collect();
    write_quotes(out, "상승 종목", &gainers, Market::Kr)?;
    let losers: Vec<&Quote> = m.losers.iter().collect();
    write_quotes(out, "하락 종목", &losers, Market::Kr)?;

    if !m.turnover_leaders.is_empty() {
        writeln!(out, "\n[거래대금 상위]")?;
        for q in &m.turnover_leaders {
            writeln!(
                out,
                "- {} ({}): {}{} · 거래량 {}",
                q.display_name,
                q.identifier,
                fmt_number(q.close, 0),
                fmt_change_suffix(q.change_pct),
                fmt_number(q.volume as f64, 0)
            )?;
        }
    }
    Ok(())
}

fn news_line(n: &NewsItem) -> String {
    match (n.source.is_empty(), n.published.is_empty()) {
        (true, true) => format!("- {}", n.headline),
        (false, true) => format!("- {} ({})", n.headline, n.source),
        (true, false) => format!("- {} ({})", n.headline, n.published),
        (false, false) => format!("- {} ({}, {})", n.headline, n.source, n.published),
    }
}

fn fmt_score(s: Option<f64>) -> String {
    s.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string())
}

fn rating_line(r: &Rating) -> String {
    format!(
        "- {}: 월가 {} / 퀀트 {} / 저자 {}",
        r.symbol,
        fmt_score(r.wall_street),
        fmt_score(r.quant),
        fmt_score(r.authors)
    )
}

pub fn render(doc: &BriefingDocument) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let ts = doc.generated_at.with_timezone(&kst());
    writeln!(out, "[데일리 마켓 브리핑] {}", ts.format("%Y-%m-%d %H:%M KST"))?;

    if !doc.discovered.is_empty() {
        writeln!(out, "\n[오늘의 발견 종목]")?;
        if !doc.discovered.us_tickers.is_empty() {
            writeln!(out, "- 미국: {}", doc.discovered.us_tickers.join(", "))?;
        }
        if !doc.discovered.kr_companies.is_empty() {
            writeln!(out, "- 한국: {}", doc.discovered.kr_companies.join(", "))?;
        }
    }

    write_market(&mut out, "미국 증시", &doc.us_market, Market::Us)?;
    write_market(&mut out, "한국 증시", &doc.kr_market, Market::Kr)?;
    write_leaders(&mut out, &doc.kr_market)?;

    if !doc.fx.is_empty() {
        writeln!(out, "\n[환율 · 원자재]")?;
        for fx in &doc.fx {
            writeln!(
                out,
                "- {}: {}{}",
                fx.name,
                fmt_number(fx.price, 2),
                fmt_change_suffix(fx.change_pct)
            )?;
        }
    }

    if !doc.headlines.is_empty() {
        writeln!(out, "\n[키워드 뉴스]")?;
        for g in group_on_change(&doc.headlines, |n| n.keyword.as_str()) {
            writeln!(out, "## {}", g.key)?;
            for n in g.items {
                writeln!(out, "{}", news_line(n))?;
            }
        }
    }

    if !doc.deep_search.is_empty() {
        writeln!(out, "\n[심층 검색]")?;
        for g in group_on_change(&doc.deep_search, |r| r.keyword.as_str()) {
            writeln!(out, "## {}", g.key)?;
            for r in g.items {
                writeln!(out, "- {}", r.title)?;
                let content = truncate_chars(&r.content, CONTENT_MAX_CHARS);
                if !content.is_empty() {
                    writeln!(out, "  {content}")?;
                }
                writeln!(out, "  {}", r.url)?;
            }
        }
    }

    if !doc.ratings.is_empty() {
        writeln!(out, "\n[애널리스트 평가]")?;
        writeln!(out, "{RATINGS_LEGEND}")?;
        for r in &doc.ratings {
            writeln!(out, "{}", rating_line(r))?;
        }
    }

    if !doc.market_news.is_empty() {
        writeln!(out, "\n[시장 뉴스]")?;
        for n in &doc.market_news {
            writeln!(out, "{}", news_line(n))?;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_strip_sign() {
        assert_eq!(fmt_pct(1.23), "▲1.23%");
        assert_eq!(fmt_pct(-1.23), "▼1.23%");
        assert_eq!(fmt_pct(0.0), "─0.00%");
        assert_eq!(fmt_pct(-0.0), "─0.00%");
    }

    #[test]
    fn thousands_separators() {
        assert_eq!(fmt_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(fmt_number(72500.0, 0), "72,500");
        assert_eq!(fmt_number(999.0, 0), "999");
        assert_eq!(fmt_number(0.5, 2), "0.50");
        assert_eq!(fmt_number(-1234.0, 0), "-1,234");
        assert_eq!(fmt_number(-0.001, 2), "0.00");
    }

    #[test]
    fn grouping_restarts_on_key_change() {
        let items = ["a1", "a2", "b1", "a3"];
        let groups = group_on_change(&items, |s| s.chars().next());
        let keys: Vec<_> = groups.iter().map(|g| g.key).collect();
        assert_eq!(keys, [Some('a'), Some('b'), Some('a')]);
        assert_eq!(groups[0].items, [&"a1", &"a2"]);
        assert!(group_on_change(&[] as &[&str], |s| s.len()).is_empty());
    }

    #[test]
    fn rating_line_shows_missing_scores() {
        let r = Rating {
            symbol: "AMD".into(),
            wall_street: Some(4.25),
            quant: None,
            authors: Some(3.0),
        };
        assert_eq!(rating_line(&r), "- AMD: 월가 4.25 / 퀀트 - / 저자 3.00");
    }
}
