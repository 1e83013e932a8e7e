//! Native SQL passthrough.
//!
//! Native queries are not rewritten. Only their placeholders are
//! normalized to `?`, under the same positional/named exclusivity as object
//! queries; every other byte of the text is preserved.

use sqlparser::dialect::GenericDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Location, Token, TokenWithSpan, Tokenizer};

use super::params::ParameterTracker;
use crate::compiled::{CompiledQuery, QueryLanguage, StatementKind};
use crate::error::CompileResult;
use crate::parser::parse_placeholder;

/// Maps tokenizer locations (1-based line and character column) to byte
/// offsets.
struct LineIndex<'a> {
    text: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(text: &'a str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { text, starts }
    }

    fn offset(&self, location: Location) -> usize {
        let line = (location.line as usize).saturating_sub(1);
        let Some(&start) = self.starts.get(line) else {
            return self.text.len();
        };
        let column = (location.column as usize).saturating_sub(1);
        self.text[start..]
            .char_indices()
            .nth(column)
            .map(|(i, _)| start + i)
            .unwrap_or(self.text.len())
    }
}

fn statement_kind(keyword: Keyword) -> StatementKind {
    match keyword {
        Keyword::SELECT | Keyword::WITH => StatementKind::Select,
        Keyword::UPDATE => StatementKind::Update,
        Keyword::DELETE => StatementKind::Delete,
        _ => StatementKind::Other,
    }
}

/// Placeholder text starting at token `i` and the index of its last token.
/// `:name` spans a colon and an adjacent unquoted word.
fn placeholder_at(tokens: &[TokenWithSpan], i: usize) -> Option<(String, usize)> {
    match &tokens[i].token {
        Token::Placeholder(text) => Some((text.clone(), i)),
        Token::Colon => {
            let next = tokens.get(i + 1)?;
            match &next.token {
                Token::Word(word) if word.quote_style.is_none() && next.span.start == tokens[i].span.end => {
                    Some((format!(":{}", word.value), i + 1))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Normalize the placeholders of a native SQL statement.
pub fn transpile_native(text: &str) -> CompileResult<CompiledQuery> {
    let dialect = GenericDialect {};
    let tokens = Tokenizer::new(&dialect, text).tokenize_with_location()?;
    let index = LineIndex::new(text);

    let mut kind = None;
    let mut params = ParameterTracker::default();
    let mut sql = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;

    while i < tokens.len() {
        if kind.is_none() {
            match &tokens[i].token {
                Token::Whitespace(_) => {}
                Token::Word(word) => kind = Some(statement_kind(word.keyword)),
                _ => kind = Some(StatementKind::Other),
            }
        }

        if let Some((placeholder, last)) = placeholder_at(&tokens, i) {
            let param = parse_placeholder(&placeholder)?;
            params.bind(&param, None)?;
            let start = index.offset(tokens[i].span.start);
            let end = index.offset(tokens[last].span.end);
            sql.push_str(&text[copied..start]);
            sql.push('?');
            copied = end;
            i = last;
        }
        i += 1;
    }
    sql.push_str(&text[copied..]);

    let order: Vec<usize> = (0..params.len()).collect();
    let kind = kind.unwrap_or(StatementKind::Other);
    tracing::debug!("Native {} with {} parameter(s)", kind, order.len());

    Ok(CompiledQuery {
        sql,
        kind,
        language: QueryLanguage::Native,
        parameters: params.finish(&order),
        return_types: Vec::new(),
        result_mappings: Vec::new(),
        primary_key_lookup: false,
        root_entity: None,
    })
}
