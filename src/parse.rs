use scraper::{ElementRef, Html, Selector};
use tokio::task::spawn_blocking;

use crate::extract::{extract_keywords, first_decimal, first_integer, parse_floor, parse_price};
use crate::record::{ListingRecord, QualityGate, UNKNOWN_PROJECT};
use crate::{Error, Result};

const CARD_SELECTOR: &str = ".istock-list";
const PRICE_SELECTOR: &str = ".text_price";
const PROJECT_SELECTOR: &str = ".text_location";
const DETAIL_SELECTOR: &str = ".ic-detail";
const LINK_SELECTOR: &str = "a";
const TITLE_SELECTOR: &str = "title";

/// The raw text pieces of one listing card, before any field extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingFragment {
    pub price_text: Option<String>,
    pub project_text: Option<String>,
    /// In page order: size, floor, bedrooms, bathrooms, ...
    pub details: Vec<String>,
    /// Link title, or the card's whole text when the link has none. `None` without a link.
    pub title_text: Option<String>,
}

/// What was kept from one page and how many listings the quality gate threw away.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageOutcome {
    pub records: Vec<ListingRecord>,
    pub dropped: usize,
}

struct ListingSelectors {
    card: Selector,
    price: Selector,
    project: Selector,
    detail: Selector,
    link: Selector,
}

impl ListingSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            card: create_selector(CARD_SELECTOR)?,
            price: create_selector(PRICE_SELECTOR)?,
            project: create_selector(PROJECT_SELECTOR)?,
            detail: create_selector(DETAIL_SELECTOR)?,
            link: create_selector(LINK_SELECTOR)?,
        })
    }
}

/// Parses the page off the async worker and returns its listing cards in page order.
pub async fn parse_fragments(html: String) -> Result<Vec<ListingFragment>> {
    spawn_blocking(move || select_fragments(&html)).await?
}

/// Selects every listing card in the document and pulls out its raw text pieces.
pub fn select_fragments(html: &str) -> Result<Vec<ListingFragment>> {
    let selectors = ListingSelectors::new()?;
    let doc = Html::parse_document(html);

    // A result page usually holds 20 cards.
    let mut fragments = Vec::with_capacity(20);
    for card in doc.select(&selectors.card) {
        let price_text = card.select(&selectors.price).next().map(element_text);
        let project_text = card.select(&selectors.project).next().map(element_text);
        let details = card.select(&selectors.detail).map(element_text).collect();
        let title_text = card.select(&selectors.link).next().map(|link| {
            link.value()
                .attr("title")
                .filter(|t| !t.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| element_text(card))
        });

        fragments.push(ListingFragment {
            price_text,
            project_text,
            details,
            title_text,
        });
    }
    Ok(fragments)
}

/// Text of the document's `<title>`, empty if there is none.
pub fn page_title(html: &str) -> String {
    let Ok(selector) = create_selector(TITLE_SELECTOR) else {
        return String::new();
    };
    Html::parse_document(html)
        .select(&selector)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

/// Extracts every fragment and keeps the ones that pass the gate.
/// A page where nothing passes is still a valid outcome.
pub fn parse_listings(fragments: &[ListingFragment], gate: &QualityGate) -> PageOutcome {
    let mut outcome = PageOutcome::default();
    for record in fragments.iter().map(parse_listing) {
        if gate.accepts(&record) {
            outcome.records.push(record);
        } else {
            outcome.dropped += 1;
        }
    }
    outcome
}

/// Turns one fragment into a record. Missing or malformed pieces fall back to defaults.
pub fn parse_listing(fragment: &ListingFragment) -> ListingRecord {
    let mut record = ListingRecord {
        price: fragment.price_text.as_deref().and_then(parse_price),
        ..Default::default()
    };

    if let Some(project) = fragment
        .project_text
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        record.project_name = project.to_string();
    }

    // Size, floor, bedrooms and bathrooms are only read when all four details are there.
    if let [size, floor, bedroom, bathroom, ..] = fragment.details.as_slice() {
        record.size_sqm = first_decimal(size);
        let floor = floor.replace('\n', " ").trim().to_string();
        record.floor_num = parse_floor(&floor);
        record.floor_range = Some(floor);
        record.bedroom = first_integer(bedroom).unwrap_or(0);
        record.bathroom = first_integer(bathroom).unwrap_or(0);
    }

    let flags = extract_keywords(fragment.title_text.as_deref());
    record.title_text = fragment.title_text.clone().unwrap_or_default();
    record.is_corner = flags.is_corner;
    record.is_river_view = flags.is_river_view;
    record.near_bts = flags.near_bts;

    record
}

#[inline]
fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::InvalidSelector(sel_str.into()))
}

/// Text nodes of the element, trimmed and joined with single spaces.
fn element_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><head><title>ขายคอนโด หน้า 3</title></head><body>
          <div class="istock-list">
            <span class="text_price">฿ 3,590,000</span>
            <span class="text_location"> Ideo Mobi Sukhumvit </span>
            <div class="ic-detail">35.5 ตร.ม.</div>
            <div class="ic-detail"><span>ชั้นที่</span>
              <span>3-4</span></div>
            <div class="ic-detail">2 ห้องนอน</div>
            <div class="ic-detail">1 ห้องน้ำ</div>
            <a href="/l/1" title="Corner unit near BTS">link</a>
          </div>
          <div class="istock-list">
            <span class="text_price">ติดต่อสอบถาม</span>
            <a href="/l/2">River view studio</a>
          </div>
        </body></html>
    "#;

    fn fragment(price: &str, details: &[&str], title: &str) -> ListingFragment {
        ListingFragment {
            price_text: Some(price.into()),
            project_text: Some("Rhythm Asoke".into()),
            details: details.iter().map(|d| d.to_string()).collect(),
            title_text: Some(title.into()),
        }
    }

    #[test]
    fn selects_cards_in_page_order() {
        let fragments = select_fragments(PAGE).unwrap();
        assert_eq!(fragments.len(), 2);

        let first = &fragments[0];
        assert_eq!(first.price_text.as_deref(), Some("฿ 3,590,000"));
        assert_eq!(first.project_text.as_deref(), Some("Ideo Mobi Sukhumvit"));
        assert_eq!(first.details.len(), 4);
        assert_eq!(first.details[1], "ชั้นที่ 3-4");
        assert_eq!(first.title_text.as_deref(), Some("Corner unit near BTS"));

        let second = &fragments[1];
        assert_eq!(second.project_text, None);
        assert!(second.details.is_empty());
        // No title attribute, falls back to the card text.
        let title = second.title_text.as_deref().unwrap();
        assert!(title.contains("River view studio"));
        assert!(title.contains("ติดต่อสอบถาม"));
    }

    #[test]
    fn reads_page_title() {
        assert_eq!(page_title(PAGE), "ขายคอนโด หน้า 3");
        assert_eq!(page_title("<p>no head</p>"), "");
    }

    #[test]
    fn full_fragment_becomes_record() {
        let fragments = select_fragments(PAGE).unwrap();
        let record = parse_listing(&fragments[0]);
        assert_eq!(record.price, Some(3_590_000));
        assert_eq!(record.project_name, "Ideo Mobi Sukhumvit");
        assert_eq!(record.size_sqm, Some(35.5));
        assert_eq!(record.floor_range.as_deref(), Some("ชั้นที่ 3-4"));
        assert_eq!(record.floor_num, Some(3.5));
        assert_eq!((record.bedroom, record.bathroom), (2, 1));
        assert!(record.is_corner && record.near_bts && !record.is_river_view);
    }

    #[test]
    fn short_detail_list_keeps_defaults() {
        let record = parse_listing(&fragment("1,200,000", &["30 ตร.ม.", "ชั้นที่ 5"], "x"));
        assert_eq!(record.price, Some(1_200_000));
        assert_eq!(record.size_sqm, None);
        assert_eq!(record.floor_range, None);
        assert_eq!(record.floor_num, None);
        assert_eq!((record.bedroom, record.bathroom), (0, 0));
    }

    #[test]
    fn missing_pieces_fall_back() {
        let record = parse_listing(&ListingFragment::default());
        assert_eq!(record, ListingRecord::default());
        assert_eq!(record.project_name, UNKNOWN_PROJECT);

        let blank_project = ListingFragment {
            project_text: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(parse_listing(&blank_project).project_name, UNKNOWN_PROJECT);
    }

    #[test]
    fn gate_filters_page() {
        let fragments = vec![
            fragment("600,000", &["25", "10", "1", "1"], "ok"),
            fragment("400,000", &["25", "10", "1", "1"], "cheap"),
            fragment("900,000", &["8", "10", "1", "1"], "tiny"),
            fragment("Studio", &["bad"], "broken"),
        ];
        let outcome = parse_listings(&fragments, &QualityGate::default());
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].price, Some(600_000));
        assert_eq!(outcome.records[0].size_sqm, Some(25.0));
        assert_eq!(outcome.dropped, 3);
    }

    #[test]
    fn page_of_broken_fragments_is_empty_not_an_error() {
        let fragments = vec![ListingFragment::default(); 5];
        let outcome = parse_listings(&fragments, &QualityGate::default());
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.dropped, 5);
    }

    #[tokio::test]
    async fn parses_on_blocking_pool() {
        let fragments = parse_fragments(PAGE.to_string()).await.unwrap();
        assert_eq!(fragments.len(), 2);
        assert!(parse_fragments(String::new()).await.unwrap().is_empty());
    }
}
