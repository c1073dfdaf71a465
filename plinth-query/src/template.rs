//! Tokenised query templates.

/// One token of a compiled template.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum QueryToken {
    /// Literal text, whitespace and newlines preserved verbatim.
    Fragment(String),

    /// A substitution point resolved by parameter name.
    NamedVar(String),

    /// A substitution point reserved for positional use by higher layers.
    IndexedVar(usize),
}

/// A compiled template: an id and the ordered token program that emits the
/// query string.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct QueryTemplate {
    pub id: String,
    pub tokens: Vec<QueryToken>,
}

/// Accumulates tokens for one template while its source lines are scanned.
/// Adjacent fragments coalesce into a single token.
pub(crate) struct TemplateBuilder {
    id: String,
    tokens: Vec<QueryToken>,
    buffer: String,
}

impl TemplateBuilder {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tokens: Vec::new(),
            buffer: String::new(),
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn add_fragment(&mut self, fragment: &str) {
        self.buffer.push_str(fragment);
    }

    /// Classifies a variable token: clean base-10 integers become indexed
    /// variables, everything else is a named variable.
    pub(crate) fn add_var(&mut self, token: &str) {
        self.close_fragment();

        match token.parse::<usize>() {
            Ok(index) => self.tokens.push(QueryToken::IndexedVar(index)),
            Err(_) => self.tokens.push(QueryToken::NamedVar(token.to_string())),
        }
    }

    /// Closes a body line; the newline survives as fragment content so
    /// template whitespace is preserved.
    pub(crate) fn end_line(&mut self) {
        self.add_fragment("\n");
    }

    pub(crate) fn finish(mut self) -> QueryTemplate {
        self.close_fragment();

        QueryTemplate {
            id: self.id,
            tokens: self.tokens,
        }
    }

    fn close_fragment(&mut self) {
        if !self.buffer.is_empty() {
            self.tokens
                .push(QueryToken::Fragment(std::mem::take(&mut self.buffer)));
        }
    }
}
