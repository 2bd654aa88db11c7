// tests/render_document.rs
//
// Text rendering of a merged document: section order, omission of empty
// sections, change markers, keyword grouping and content truncation.

use chrono::{TimeZone, Utc};
use daily_briefing::model::{
    BriefingDocument, EntitySet, FxRate, IndexSnapshot, InvestorFlow, MarketSection, NewsItem,
    Origin, Quote, Rating, SearchResult,
};
use daily_briefing::render::{render, CONTENT_MAX_CHARS, RATINGS_LEGEND};

fn empty_doc() -> BriefingDocument {
    BriefingDocument {
        // 2026-10-18 23:30 UTC == 2026-10-19 08:30 KST
        generated_at: Utc.with_ymd_and_hms(2026, 10, 18, 23, 30, 0).unwrap(),
        discovered: EntitySet::default(),
        us_market: MarketSection::default(),
        kr_market: MarketSection::default(),
        fx: Vec::new(),
        headlines: Vec::new(),
        deep_search: Vec::new(),
        ratings: Vec::new(),
        market_news: Vec::new(),
    }
}

fn quote(id: &str, name: &str, close: f64, pct: Option<f64>, origin: Origin) -> Quote {
    Quote {
        identifier: id.into(),
        display_name: name.into(),
        close,
        prev_close: None,
        change: None,
        change_pct: pct,
        volume: 12_345_678,
        market_cap: None,
        origin,
    }
}

fn news(kw: &str, h: &str) -> NewsItem {
    NewsItem {
        keyword: kw.into(),
        headline: h.into(),
        source: String::new(),
        published: String::new(),
    }
}

fn hit(kw: &str, url: &str, content: &str) -> SearchResult {
    SearchResult {
        keyword: kw.into(),
        title: format!("title {url}"),
        content: content.into(),
        url: url.into(),
    }
}

fn full_doc() -> BriefingDocument {
    let mut doc = empty_doc();
    doc.discovered = EntitySet {
        us_tickers: vec!["AMD".into()],
        kr_companies: vec!["기아".into()],
    };
    doc.us_market = MarketSection {
        indices: vec![IndexSnapshot {
            name: "S&P500".into(),
            close: 5812.35,
            change_pct: Some(1.23),
        }],
        holdings: vec![
            quote("AAPL", "Apple", 230.0, Some(-1.23), Origin::Fixed),
            quote("AMD", "AMD", 150.5, Some(0.0), Origin::Discovered),
        ],
        ..Default::default()
    };
    doc.kr_market = MarketSection {
        indices: vec![IndexSnapshot {
            name: "KOSPI".into(),
            close: 2600.0,
            change_pct: Some(-0.5),
        }],
        holdings: vec![
            quote("005930", "삼성전자", 71400.0, Some(2.0), Origin::Fixed),
            quote("000270", "기아", 98000.0, None, Origin::Discovered),
        ],
        investor_flow: vec![
            InvestorFlow {
                investor: "외국인".into(),
                net_buy: 123_456_789,
            },
            InvestorFlow {
                investor: "개인".into(),
                net_buy: -98_765,
            },
        ],
        gainers: vec![quote("005930", "삼성전자", 71400.0, Some(2.0), Origin::Fixed)],
        losers: vec![quote("035720", "카카오", 41000.0, Some(-3.1), Origin::Fixed)],
        turnover_leaders: vec![quote("005930", "삼성전자", 71400.0, Some(2.0), Origin::Fixed)],
    };
    doc.fx = vec![FxRate {
        name: "USD/KRW".into(),
        price: 1385.2,
        change_pct: Some(0.12),
    }];
    doc.headlines = vec![news("코스피", "h1"), news("코스피", "h2"), news("금리", "h3")];
    doc.deep_search = vec![hit("NVDA", "u1", "c1"), hit("AMD", "u2", "c2")];
    doc.ratings = vec![Rating {
        symbol: "NVDA".into(),
        wall_street: Some(4.5),
        quant: Some(3.25),
        authors: None,
    }];
    doc.market_news = vec![news("stock market", "Stocks close higher")];
    doc
}

fn position(text: &str, needle: &str) -> usize {
    text.find(needle)
        .unwrap_or_else(|| panic!("missing {needle:?} in:\n{text}"))
}

#[test]
fn empty_document_renders_only_the_header() {
    let text = render(&empty_doc()).unwrap();
    assert_eq!(text, "[데일리 마켓 브리핑] 2026-10-19 08:30 KST\n");
}

#[test]
fn sections_follow_canonical_order() {
    let text = render(&full_doc()).unwrap();
    let order = [
        "[데일리 마켓 브리핑]",
        "[오늘의 발견 종목]",
        "[미국 증시 지수]",
        "[미국 증시 주요 종목]",
        "[미국 증시 발견 종목]",
        "[한국 증시 지수]",
        "[한국 증시 주요 종목]",
        "[한국 증시 발견 종목]",
        "[투자자별 순매수]",
        "[상승 종목]",
        "[하락 종목]",
        "[거래대금 상위]",
        "[환율 · 원자재]",
        "[키워드 뉴스]",
        "[심층 검색]",
        "[애널리스트 평가]",
        "[시장 뉴스]",
    ];
    let positions: Vec<usize> = order.iter().map(|s| position(&text, s)).collect();
    assert!(
        positions.windows(2).all(|w| w[0] < w[1]),
        "out of order: {positions:?}\n{text}"
    );
}

#[test]
fn change_markers_and_numbers() {
    let text = render(&full_doc()).unwrap();
    assert!(text.contains("- S&P500: 5,812.35 ▲1.23%"), "{text}");
    assert!(text.contains("- Apple (AAPL): 230.00 ▼1.23%"));
    assert!(text.contains("- AMD (AMD): 150.50 ─0.00%"));
    assert!(text.contains("- 삼성전자 (005930): 71,400 ▲2.00%"));
    // No change available: no marker at all.
    assert!(text.contains("- 기아 (000270): 98,000\n"));
    assert!(text.contains("- 외국인: ▲123,456,789원"));
    assert!(text.contains("- 개인: ▼98,765원"));
    assert!(text.contains("· 거래량 12,345,678"));
    assert!(text.contains("- USD/KRW: 1,385.20 ▲0.12%"));
}

#[test]
fn ratings_carry_the_legend() {
    let text = render(&full_doc()).unwrap();
    let section = &text[position(&text, "[애널리스트 평가]")..];
    let mut lines = section.lines().skip(1);
    assert_eq!(lines.next(), Some(RATINGS_LEGEND));
    assert_eq!(lines.next(), Some("- NVDA: 월가 4.50 / 퀀트 3.25 / 저자 -"));
}

#[test]
fn headline_groups_open_on_keyword_change() {
    let mut doc = empty_doc();
    doc.headlines = vec![
        news("코스피", "h1"),
        news("코스피", "h2"),
        news("금리", "h3"),
        news("코스피", "h4"),
    ];
    let text = render(&doc).unwrap();
    let expected = "\n[키워드 뉴스]\n## 코스피\n- h1\n- h2\n## 금리\n- h3\n## 코스피\n- h4\n";
    assert!(text.ends_with(expected), "{text}");
}

#[test]
fn search_content_is_truncated() {
    let mut doc = empty_doc();
    let long: String = "가".repeat(CONTENT_MAX_CHARS + 50);
    doc.deep_search = vec![hit("NVDA", "https://a.example/1", &long)];
    let text = render(&doc).unwrap();

    let body_line = text
        .lines()
        .find(|l| l.starts_with("  가"))
        .expect("content line");
    assert_eq!(body_line.trim().chars().count(), CONTENT_MAX_CHARS);
    assert!(text.contains("## NVDA\n- title https://a.example/1\n"));
    assert!(text.contains("  https://a.example/1\n"));
}

#[test]
fn empty_market_sections_are_omitted() {
    let mut doc = full_doc();
    doc.us_market = MarketSection::default();
    doc.discovered = EntitySet::default();
    let text = render(&doc).unwrap();
    assert!(!text.contains("[미국 증시"));
    assert!(!text.contains("[오늘의 발견 종목]"));
    assert!(text.contains("[한국 증시 지수]"));
}
