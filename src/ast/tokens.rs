use serde::Serialize;

/// Kind of a lexical token.
///
/// Keywords are matched case-insensitively, so `click`, `Click` and `CLICK`
/// all produce [`TokenKind::Click`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    // Declarations
    Page,
    PageActions,
    Feature,
    Scenario,
    Field,
    Use,
    Before,
    After,
    Each,
    All,

    // Variable kinds and VDQL result types
    Text,
    Number,
    Flag,
    List,
    Data,

    // Actions
    Open,
    Navigate,
    Click,
    Fill,
    Hover,
    Check,
    Uncheck,
    Select,
    Scroll,
    Up,
    Down,
    Press,
    Drag,
    Upload,
    Wait,
    Seconds,
    Milliseconds,
    Refresh,
    Clear,
    Take,
    Screenshot,
    Log,
    Switch,
    New,
    Tab,
    Close,
    Frame,
    Main,
    Accept,
    Dismiss,
    Dialog,
    Cookies,
    Storage,
    Perform,

    // Assertions
    Verify,
    Is,
    Not,
    Visible,
    Hidden,
    Enabled,
    Disabled,
    Checked,
    Empty,
    Focused,
    Has,
    Contains,
    Value,
    Attribute,
    Count,
    Url,
    Title,
    Matches,

    // Control flow
    If,
    Else,
    Repeat,
    Times,
    For,
    In,

    // VDQL
    Load,
    Row,
    Rows,
    Where,
    And,
    Or,
    Order,
    By,
    Asc,
    Desc,
    Limit,
    Offset,
    Sum,
    Average,
    Min,
    Max,
    Distinct,
    Starts,
    Ends,

    // Connectives
    With,
    From,
    To,
    As,

    // Literals
    True,
    False,
    Identifier,
    StringLiteral,
    /// Integer or decimal literal, optionally negative.
    NumberLiteral,
    /// Environment variable reference: `{{BASE_URL}}`
    EnvVar,
    /// Scenario or feature tag: `@smoke`
    Tag,

    // Punctuation
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Dot,
    Equals,
    EqEq,
    NotEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
    Plus,

    /// `# ...` or `// ...` up to end of line
    Comment,
    Eof,
}

impl TokenKind {
    /// Looks up a word in the keyword table. The match is case-insensitive.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word.to_ascii_uppercase().as_str() {
            "PAGE" => TokenKind::Page,
            "PAGEACTIONS" => TokenKind::PageActions,
            "FEATURE" => TokenKind::Feature,
            "SCENARIO" => TokenKind::Scenario,
            "FIELD" => TokenKind::Field,
            "USE" => TokenKind::Use,
            "BEFORE" => TokenKind::Before,
            "AFTER" => TokenKind::After,
            "EACH" => TokenKind::Each,
            "ALL" => TokenKind::All,
            "TEXT" => TokenKind::Text,
            "NUMBER" => TokenKind::Number,
            "FLAG" => TokenKind::Flag,
            "LIST" => TokenKind::List,
            "DATA" => TokenKind::Data,
            "OPEN" => TokenKind::Open,
            "NAVIGATE" => TokenKind::Navigate,
            "CLICK" => TokenKind::Click,
            "FILL" => TokenKind::Fill,
            "HOVER" => TokenKind::Hover,
            "CHECK" => TokenKind::Check,
            "UNCHECK" => TokenKind::Uncheck,
            "SELECT" => TokenKind::Select,
            "SCROLL" => TokenKind::Scroll,
            "UP" => TokenKind::Up,
            "DOWN" => TokenKind::Down,
            "PRESS" => TokenKind::Press,
            "DRAG" => TokenKind::Drag,
            "UPLOAD" => TokenKind::Upload,
            "WAIT" => TokenKind::Wait,
            "SECONDS" | "SECOND" => TokenKind::Seconds,
            "MILLISECONDS" | "MILLISECOND" => TokenKind::Milliseconds,
            "REFRESH" => TokenKind::Refresh,
            "CLEAR" => TokenKind::Clear,
            "TAKE" => TokenKind::Take,
            "SCREENSHOT" => TokenKind::Screenshot,
            "LOG" => TokenKind::Log,
            "SWITCH" => TokenKind::Switch,
            "NEW" => TokenKind::New,
            "TAB" => TokenKind::Tab,
            "CLOSE" => TokenKind::Close,
            "FRAME" => TokenKind::Frame,
            "MAIN" => TokenKind::Main,
            "ACCEPT" => TokenKind::Accept,
            "DISMISS" => TokenKind::Dismiss,
            "DIALOG" => TokenKind::Dialog,
            "COOKIES" => TokenKind::Cookies,
            "STORAGE" => TokenKind::Storage,
            "PERFORM" => TokenKind::Perform,
            "VERIFY" => TokenKind::Verify,
            "IS" => TokenKind::Is,
            "NOT" => TokenKind::Not,
            "VISIBLE" => TokenKind::Visible,
            "HIDDEN" => TokenKind::Hidden,
            "ENABLED" => TokenKind::Enabled,
            "DISABLED" => TokenKind::Disabled,
            "CHECKED" => TokenKind::Checked,
            "EMPTY" => TokenKind::Empty,
            "FOCUSED" => TokenKind::Focused,
            "HAS" => TokenKind::Has,
            "CONTAINS" => TokenKind::Contains,
            "VALUE" => TokenKind::Value,
            "ATTRIBUTE" => TokenKind::Attribute,
            "COUNT" => TokenKind::Count,
            "URL" => TokenKind::Url,
            "TITLE" => TokenKind::Title,
            "MATCHES" => TokenKind::Matches,
            "IF" => TokenKind::If,
            "ELSE" => TokenKind::Else,
            "REPEAT" => TokenKind::Repeat,
            "TIMES" => TokenKind::Times,
            "FOR" => TokenKind::For,
            "IN" => TokenKind::In,
            "LOAD" => TokenKind::Load,
            "ROW" => TokenKind::Row,
            "ROWS" => TokenKind::Rows,
            "WHERE" => TokenKind::Where,
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "ORDER" => TokenKind::Order,
            "BY" => TokenKind::By,
            "ASC" => TokenKind::Asc,
            "DESC" => TokenKind::Desc,
            "LIMIT" => TokenKind::Limit,
            "OFFSET" => TokenKind::Offset,
            "SUM" => TokenKind::Sum,
            "AVERAGE" => TokenKind::Average,
            "MIN" => TokenKind::Min,
            "MAX" => TokenKind::Max,
            "DISTINCT" => TokenKind::Distinct,
            "STARTS" => TokenKind::Starts,
            "ENDS" => TokenKind::Ends,
            "WITH" => TokenKind::With,
            "FROM" => TokenKind::From,
            "TO" => TokenKind::To,
            "AS" => TokenKind::As,
            "TRUE" => TokenKind::True,
            "FALSE" => TokenKind::False,
            _ => return None,
        };
        Some(kind)
    }

    /// True for every entry of the keyword table.
    pub fn is_keyword(self) -> bool {
        !matches!(
            self,
            TokenKind::Identifier
                | TokenKind::StringLiteral
                | TokenKind::NumberLiteral
                | TokenKind::EnvVar
                | TokenKind::Tag
                | TokenKind::LBrace
                | TokenKind::RBrace
                | TokenKind::LParen
                | TokenKind::RParen
                | TokenKind::Comma
                | TokenKind::Dot
                | TokenKind::Equals
                | TokenKind::EqEq
                | TokenKind::NotEq
                | TokenKind::Gt
                | TokenKind::Lt
                | TokenKind::GtEq
                | TokenKind::LtEq
                | TokenKind::Plus
                | TokenKind::Comment
                | TokenKind::Eof
        )
    }

    /// Keywords that may open a statement. The parser resynchronizes on these.
    pub fn starts_statement(self) -> bool {
        matches!(
            self,
            TokenKind::Open
                | TokenKind::Navigate
                | TokenKind::Click
                | TokenKind::Fill
                | TokenKind::Hover
                | TokenKind::Check
                | TokenKind::Uncheck
                | TokenKind::Select
                | TokenKind::Scroll
                | TokenKind::Press
                | TokenKind::Drag
                | TokenKind::Upload
                | TokenKind::Wait
                | TokenKind::Refresh
                | TokenKind::Clear
                | TokenKind::Take
                | TokenKind::Log
                | TokenKind::Switch
                | TokenKind::Close
                | TokenKind::Accept
                | TokenKind::Dismiss
                | TokenKind::Perform
                | TokenKind::Verify
                | TokenKind::If
                | TokenKind::Repeat
                | TokenKind::For
                | TokenKind::Load
                | TokenKind::Text
                | TokenKind::Number
                | TokenKind::Flag
                | TokenKind::List
                | TokenKind::Data
        )
    }

    /// Keywords that open a top-level declaration.
    pub fn starts_declaration(self) -> bool {
        matches!(
            self,
            TokenKind::Page | TokenKind::PageActions | TokenKind::Feature
        )
    }

    /// Human-readable description used in "expected X, found Y" messages.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Identifier => "a name",
            TokenKind::StringLiteral => "a quoted string",
            TokenKind::NumberLiteral => "a number",
            TokenKind::EnvVar => "an environment reference",
            TokenKind::Tag => "a tag",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::Equals => "'='",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::Gt => "'>'",
            TokenKind::Lt => "'<'",
            TokenKind::GtEq => "'>='",
            TokenKind::LtEq => "'<='",
            TokenKind::Plus => "'+'",
            TokenKind::Comment => "a comment",
            TokenKind::Eof => "end of file",
            _ => "a keyword",
        }
    }
}

/// A lexical token with its 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token. For strings this is the unescaped content,
    /// for environment references the variable name, for tags the name
    /// without `@`.
    pub value: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, line: usize, column: usize) -> Self {
        Token {
            kind,
            value: value.into(),
            line,
            column,
        }
    }

    /// Words are identifiers or keywords; both are accepted where a name is expected.
    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Identifier || self.kind.is_keyword()
    }

    /// Short rendering for error messages: `'CLICK'`, `"Submit"`, `end of file`.
    pub fn display(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::StringLiteral => format!("\"{}\"", self.value),
            TokenKind::EnvVar => format!("{{{{{}}}}}", self.value),
            TokenKind::Tag => format!("@{}", self.value),
            _ => format!("'{}'", self.value),
        }
    }
}
