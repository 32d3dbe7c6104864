//! Tagged AST node set (spec.md §3). A single enum, rather than one type per
//! construct, since `construct`'s builder just needs *a* `Node` to wrap —
//! and the grammar never needs to hold heterogeneous node collections more
//! strongly typed than this.

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    /// Text is preserved verbatim rather than parsed into `i64` here; the
    /// engine parses it into a runtime `Value` at evaluation time.
    Integer(String),
    Float(String),
    Bool(String),
    /// Quotes retained.
    String(String),
    /// Dotted, up to three parts, e.g. `schema.table.col`.
    Name(String),

    BinaryOp {
        op: String,
        left: Box<Node>,
        right: Box<Node>,
    },
    UnaryOp {
        op: String,
        arg: Box<Node>,
    },

    Call {
        func: String,
        args: Vec<Node>,
    },
    CallSetFunction {
        func: String,
        quantifier: Option<String>,
        arg: Box<Node>,
    },
    CallAnalyticsFunction {
        call: Box<Node>,
        partition_by: Option<Vec<Node>>,
        order_by: Option<Vec<Node>>,
    },

    Case {
        condition: Box<Node>,
        result: Box<Node>,
    },
    CaseExpression {
        cases: Vec<Node>,
        else_: Option<Box<Node>>,
    },

    Cast {
        value: Box<Node>,
        type_name: String,
    },

    WildCard {
        table: Option<String>,
    },
    Column {
        value: Box<Node>,
        alias: Option<String>,
    },

    TableRef {
        schema: Option<String>,
        name: String,
        alias: Option<String>,
    },
    TableFunction {
        func: String,
        args: Vec<Node>,
        alias: Option<String>,
    },
    SubQuery {
        query: Box<Node>,
        alias: Option<String>,
    },
    Lateral {
        table: Box<Node>,
    },
    Join {
        how: String,
        left: Option<Box<Node>>,
        right: Box<Node>,
        on: Box<Node>,
    },

    FromClause {
        tables: Vec<Node>,
    },
    OrderBy {
        value: Box<Node>,
        order: String,
    },

    Select {
        cte: Option<Vec<Node>>,
        quantifier: Option<String>,
        columns: Vec<Node>,
        from_clause: Option<Box<Node>>,
        where_clause: Option<Box<Node>>,
        group_by_clause: Option<Vec<Node>>,
        having_clause: Option<Box<Node>>,
        order_by_clause: Option<Vec<Node>>,
        limit_clause: Option<Box<Node>>,
        offset_clause: Option<Box<Node>>,
    },

    CopyFrom {
        table: String,
        path: String,
        options: Vec<(String, Node)>,
    },
    CopyTo {
        source: Box<Node>,
        path: String,
        options: Vec<(String, Node)>,
    },
    DropTable {
        names: Vec<String>,
    },
    CreateTableAs {
        name: String,
        query: Box<Node>,
    },
    Show {
        tail: Vec<String>,
    },
}

impl Node {
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Name(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_column_reference(&self) -> bool {
        matches!(self, Node::Name(_))
    }
}
