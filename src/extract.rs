use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::config::{Configuration, DictionaryVariant, SynonymVariant};
use crate::error::ExtractionError;
use crate::types::{DictionaryEntry, LookupMode, LookupRequest};

/// Tag stripping and text cleanup shared by every strategy.
pub struct MarkupCleaner {
    list_item: Regex,
    line_break: Regex,
    any_tag: Regex,
    whitespace: Regex,
}

impl MarkupCleaner {
    pub fn new() -> Result<Self, ExtractionError> {
        Ok(Self {
            list_item: Regex::new(r"(?i)<li\b[^>]*>")?,
            line_break: Regex::new(r"(?i)<br\s*/?>")?,
            any_tag: Regex::new(r"<[^>]*>")?,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    /// Flatten a fragment to one line of text: nested items and breaks become
    /// spaces, every other tag is dropped.
    pub fn inline_text(&self, fragment: &str) -> String {
        let text = self.list_item.replace_all(fragment, " ");
        let text = self.line_break.replace_all(&text, " ");
        let text = self.any_tag.replace_all(&text, "");
        self.clean_text(&text)
    }

    /// Split a list body into one string per item, dropping empty lines.
    pub fn item_lines(&self, list_body: &str) -> Vec<String> {
        let text = self.list_item.replace_all(list_body, "\n");
        let text = self.line_break.replace_all(&text, " ");
        let text = self.any_tag.replace_all(&text, "");
        text.lines()
            .map(|line| self.clean_text(line))
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Decode entities, collapse whitespace, trim.
    pub fn clean_text(&self, text: &str) -> String {
        self.collapse_whitespace(&html_escape::decode_html_entities(text))
    }

    /// Whitespace cleanup only, for text a parser has already decoded.
    pub fn collapse_whitespace(&self, text: &str) -> String {
        self.whitespace.replace_all(text, " ").trim().to_string()
    }
}

/// One way of pulling result lines out of a dictionary page.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this strategy is meant for the given mode and settings.
    fn applies(&self, mode: LookupMode, config: &Configuration) -> bool;

    /// Cleaned descriptions in page order. An empty vec means "nothing here".
    fn descriptions(
        &self,
        page: &str,
        mode: LookupMode,
        cleaner: &MarkupCleaner,
    ) -> Result<Vec<String>, ExtractionError>;
}

/// Italian dictionary: one `<li class='definition'>` per sense, each on its
/// own line.
pub struct DefinitionItems {
    item: Regex,
}

impl DefinitionItems {
    pub fn new() -> Result<Self, ExtractionError> {
        Ok(Self {
            item: Regex::new(r#"(?m)^[ \t]*<li\s*class=['"]definition['"][^>]*>(.*)</li[^>]*>"#)?,
        })
    }
}

impl ExtractionStrategy for DefinitionItems {
    fn name(&self) -> &'static str {
        "definition-items"
    }

    fn applies(&self, mode: LookupMode, config: &Configuration) -> bool {
        mode == LookupMode::Definition && config.dictionary == DictionaryVariant::Italian
    }

    fn descriptions(
        &self,
        page: &str,
        _mode: LookupMode,
        cleaner: &MarkupCleaner,
    ) -> Result<Vec<String>, ExtractionError> {
        Ok(self
            .item
            .captures_iter(page)
            .map(|caps| cleaner.inline_text(&caps[1]))
            .filter(|text| !text.is_empty())
            .collect())
    }
}

const THESAURUS_SELECTOR: &str = "div.clickable.engthes";
const SPAN_SELECTOR: &str = "span";

/// English thesaurus: plain `<span>` words inside the first
/// `clickable engthes` block.
pub struct ThesaurusSpans {
    container: Selector,
    span: Selector,
}

impl ThesaurusSpans {
    pub fn new() -> Result<Self, ExtractionError> {
        Ok(Self {
            container: parse_selector(THESAURUS_SELECTOR)?,
            span: parse_selector(SPAN_SELECTOR)?,
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector).map_err(|_| ExtractionError::Selector(selector.to_string()))
}

impl ExtractionStrategy for ThesaurusSpans {
    fn name(&self) -> &'static str {
        "thesaurus-spans"
    }

    fn applies(&self, mode: LookupMode, config: &Configuration) -> bool {
        mode == LookupMode::Synonym && config.synonyms == SynonymVariant::English
    }

    fn descriptions(
        &self,
        page: &str,
        _mode: LookupMode,
        cleaner: &MarkupCleaner,
    ) -> Result<Vec<String>, ExtractionError> {
        let document = Html::parse_document(page);
        let Some(container) = document.select(&self.container).next() else {
            debug!("No thesaurus block on page");
            return Ok(Vec::new());
        };

        Ok(container
            .select(&self.span)
            // Only spans holding bare text; wrapper spans would repeat words.
            .filter(|span| span.children().all(|child| child.value().is_text()))
            .map(|span| cleaner.collapse_whitespace(&span.text().collect::<String>()))
            .filter(|text| !text.is_empty())
            .collect())
    }
}

/// Every other edition: the first `<ol>` (definitions) or `<ul>` (synonyms),
/// one result per list line.
pub struct FirstList {
    definitions: Regex,
    synonyms: Regex,
}

impl FirstList {
    pub fn new() -> Result<Self, ExtractionError> {
        Ok(Self {
            definitions: list_tag_pattern("ol")?,
            synonyms: list_tag_pattern("ul")?,
        })
    }

    /// Inner markup of the first list in the page, honouring nested lists of
    /// the same kind.
    fn first_list_body<'a>(
        page: &'a str,
        tags: &Regex,
        tag: &'static str,
    ) -> Result<Option<&'a str>, ExtractionError> {
        let mut depth = 0usize;
        let mut start = None;
        for caps in tags.captures_iter(page) {
            let Some(whole) = caps.get(0) else { continue };
            let closing = caps.get(1).is_some();
            match (closing, start) {
                (false, None) => {
                    start = Some(whole.end());
                    depth = 1;
                }
                (false, Some(_)) => depth += 1,
                (true, None) => continue,
                (true, Some(body_start)) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(Some(&page[body_start..whole.start()]));
                    }
                }
            }
        }
        match start {
            Some(_) => Err(ExtractionError::UnbalancedMarkup(tag)),
            None => Ok(None),
        }
    }
}

fn list_tag_pattern(tag: &str) -> Result<Regex, ExtractionError> {
    Ok(Regex::new(&format!(r"(?i)<(/)?{}\b[^>]*>", tag))?)
}

impl ExtractionStrategy for FirstList {
    fn name(&self) -> &'static str {
        "first-list"
    }

    fn applies(&self, mode: LookupMode, config: &Configuration) -> bool {
        match mode {
            LookupMode::Definition => config.dictionary != DictionaryVariant::Italian,
            LookupMode::Synonym => config.synonyms != SynonymVariant::English,
        }
    }

    fn descriptions(
        &self,
        page: &str,
        mode: LookupMode,
        cleaner: &MarkupCleaner,
    ) -> Result<Vec<String>, ExtractionError> {
        let (tags, tag) = match mode {
            LookupMode::Definition => (&self.definitions, "ol"),
            LookupMode::Synonym => (&self.synonyms, "ul"),
        };
        match Self::first_list_body(page, tags, tag)? {
            Some(body) => Ok(cleaner.item_lines(body)),
            None => {
                debug!("No <{}> on page", tag);
                Ok(Vec::new())
            }
        }
    }
}

/// Runs the strategies in order; the first applicable one that finds anything
/// wins.
pub struct ResultExtractor {
    cleaner: MarkupCleaner,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl ResultExtractor {
    pub fn new() -> Result<Self, ExtractionError> {
        Self::with_strategies(vec![
            Box::new(DefinitionItems::new()?),
            Box::new(ThesaurusSpans::new()?),
            Box::new(FirstList::new()?),
        ])
    }

    pub fn with_strategies(
        strategies: Vec<Box<dyn ExtractionStrategy>>,
    ) -> Result<Self, ExtractionError> {
        Ok(Self {
            cleaner: MarkupCleaner::new()?,
            strategies,
        })
    }

    /// Entries found in `page`, fetched from `source_url`. Empty when no
    /// strategy matched anything.
    pub fn extract(
        &self,
        page: &str,
        request: &LookupRequest,
        config: &Configuration,
        source_url: &str,
    ) -> Result<Vec<DictionaryEntry>, ExtractionError> {
        for strategy in self
            .strategies
            .iter()
            .filter(|s| s.applies(request.mode, config))
        {
            let descriptions = strategy.descriptions(page, request.mode, &self.cleaner)?;
            if descriptions.is_empty() {
                debug!("Strategy {} found nothing", strategy.name());
                continue;
            }

            info!(
                "Strategy {} extracted {} entries for '{}'",
                strategy.name(),
                descriptions.len(),
                request.word
            );
            return Ok(descriptions
                .into_iter()
                .enumerate()
                .map(|(i, description)| DictionaryEntry {
                    id: format!("index_{}", i),
                    label: request.word.clone(),
                    source_url: source_url.to_string(),
                    description,
                })
                .collect());
        }

        Ok(Vec::new())
    }
}
