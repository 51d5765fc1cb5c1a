//! SQL classification against the whitelist
//!
//! The classifier is pure: raw SQL text in, a typed classification out.
//! It is a positive whitelist with a conservative screen in front: any
//! reserved forbidden token outside a string literal forces `Rejected`
//! before the patterns are consulted, so an unrecognised query can never
//! fall through to the store.

mod lexer;

pub use lexer::{tokenize, Token};

use crate::schema::TableSchema;

/// Typed outcome of classifying one SQL text
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// `SELECT @@version`
    Version,
    /// `SHOW TABLES`
    ShowTables,
    /// `DESC <table>` / `DESCRIBE <table>`
    Describe {
        /// Known table being described
        table: String,
    },
    /// Single primary-key equality lookup
    PkLookup {
        /// Table the predicate targets
        table: String,
        /// Literal value the primary key must equal
        pk_value: String,
    },
    /// `SELECT * FROM <table>` with no predicate
    FullScan {
        /// Table being scanned
        table: String,
    },
    /// `SELECT qr_verify('<token>')`
    TokenVerify {
        /// Token literal to consume
        token: String,
    },
    /// Session-setup chatter answered with OK and no rows
    Noop,
    /// Everything else
    Rejected {
        /// Short machine-readable cause, for the warn log
        reason: &'static str,
    },
}

/// Classify `sql` against the whitelist, `tables` being the known schemas
pub fn classify(sql: &str, tables: &[&TableSchema]) -> Classification {
    let mut tokens = match tokenize(sql) {
        Ok(tokens) => tokens,
        Err(_) => return Classification::Rejected { reason: "unreadable" },
    };
    while tokens.last() == Some(&Token::Symbol(';')) {
        tokens.pop();
    }
    if tokens.is_empty() {
        return Classification::Noop;
    }

    let Some(head) = keyword(&tokens[0]) else {
        return Classification::Rejected {
            reason: "unknown_query",
        };
    };

    match head.as_str() {
        // session-setup chatter
        "SET" | "USE" => return Classification::Noop,
        "SHOW" => {
            return match keyword_at(&tokens, 1).as_deref() {
                Some("TABLES") if tokens.len() == 2 => Classification::ShowTables,
                Some("VARIABLES") => Classification::Noop,
                _ => Classification::Rejected {
                    reason: "show_not_allowed",
                },
            };
        }
        "DESC" | "DESCRIBE" => {
            if tokens.len() == 2 {
                if let Token::Ident(name) = &tokens[1] {
                    if let Some(table) = find_table(tables, name) {
                        return Classification::Describe {
                            table: table.name.clone(),
                        };
                    }
                }
            }
            return Classification::Rejected {
                reason: "unknown_table",
            };
        }
        "SELECT" => {}
        other => {
            return Classification::Rejected {
                reason: forbidden_reason(other).unwrap_or("unknown_query"),
            };
        }
    }

    if let Some(reason) = screen(&tokens) {
        return Classification::Rejected { reason };
    }

    classify_select(&tokens[1..], tables)
}

fn classify_select(body: &[Token], tables: &[&TableSchema]) -> Classification {
    // SELECT @@version, and the system-variable chatter connectors send
    if let Some(Token::SysVar(name)) = body.first() {
        if body.len() == 1 && name.eq_ignore_ascii_case("version") {
            return Classification::Version;
        }
        if !body.iter().any(|t| is_keyword(t, "FROM")) {
            return Classification::Noop;
        }
        return Classification::Rejected {
            reason: "unknown_query",
        };
    }

    // SELECT 1
    if body.len() == 1 && matches!(body[0], Token::Number(_)) {
        return Classification::Noop;
    }

    // SELECT qr_verify('<token>')
    if body.len() == 4 {
        if let (Token::Ident(func), Token::Symbol('('), Token::Str(token), Token::Symbol(')')) =
            (&body[0], &body[1], &body[2], &body[3])
        {
            return if func.eq_ignore_ascii_case("qr_verify") {
                Classification::TokenVerify {
                    token: token.clone(),
                }
            } else {
                Classification::Rejected {
                    reason: "function_not_allowed",
                }
            };
        }
    }

    // SELECT * FROM <table> [WHERE <pk> = <literal>]
    if body.first() == Some(&Token::Symbol('*')) && body.len() >= 3 {
        if !is_keyword(&body[1], "FROM") {
            return Classification::Rejected {
                reason: "unsupported_select",
            };
        }
        let Token::Ident(name) = &body[2] else {
            return Classification::Rejected {
                reason: "unsupported_select",
            };
        };
        let Some(table) = find_table(tables, name) else {
            return Classification::Rejected {
                reason: "unknown_table",
            };
        };

        let rest = &body[3..];
        if rest.is_empty() {
            return Classification::FullScan {
                table: table.name.clone(),
            };
        }
        if rest.len() == 4 && is_keyword(&rest[0], "WHERE") && rest[2] == Token::Symbol('=') {
            let Token::Ident(column) = &rest[1] else {
                return Classification::Rejected {
                    reason: "unsupported_select",
                };
            };
            let value = match &rest[3] {
                Token::Str(value) => value.clone(),
                Token::Number(value) => value.clone(),
                _ => {
                    return Classification::Rejected {
                        reason: "unsupported_select",
                    }
                }
            };
            return if column.eq_ignore_ascii_case(&table.pk) {
                Classification::PkLookup {
                    table: table.name.clone(),
                    pk_value: value,
                }
            } else {
                Classification::Rejected {
                    reason: "non_pk_predicate",
                }
            };
        }
        return Classification::Rejected {
            reason: "unsupported_select",
        };
    }

    if body.iter().any(|t| is_keyword(t, "FROM")) {
        return Classification::Rejected {
            reason: "projection_not_allowed",
        };
    }
    Classification::Rejected {
        reason: "unknown_query",
    }
}

/// Reject on any forbidden token outside a string literal
fn screen(tokens: &[Token]) -> Option<&'static str> {
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Ident(word) => {
                if let Some(reason) = forbidden_reason(word) {
                    return Some(reason);
                }
                if matches!(tokens.get(i + 1), Some(Token::Symbol('(')))
                    && !word.eq_ignore_ascii_case("qr_verify")
                {
                    return Some("function_not_allowed");
                }
            }
            Token::Symbol('<') | Token::Symbol('>') | Token::Symbol('!') => {
                return Some("comparison_not_allowed")
            }
            Token::Symbol(';') => return Some("multi_statement_not_allowed"),
            Token::Symbol('(') => {
                if let Some(Token::Ident(next)) = tokens.get(i + 1) {
                    if next.eq_ignore_ascii_case("SELECT") {
                        return Some("subquery_not_allowed");
                    }
                }
            }
            _ => {}
        }
    }

    // a single equality is the only comparison the whitelist admits
    if tokens
        .iter()
        .filter(|t| matches!(t, Token::Symbol('=')))
        .count()
        > 1
    {
        return Some("comparison_not_allowed");
    }
    None
}

fn forbidden_reason(word: &str) -> Option<&'static str> {
    match word.to_ascii_uppercase().as_str() {
        "AND" => Some("and_not_allowed"),
        "OR" => Some("or_not_allowed"),
        "LIKE" => Some("like_not_allowed"),
        "IN" => Some("in_not_allowed"),
        "BETWEEN" => Some("between_not_allowed"),
        "JOIN" | "INNER" | "OUTER" | "CROSS" | "NATURAL" => Some("join_not_allowed"),
        "ORDER" => Some("order_by_not_allowed"),
        "GROUP" => Some("group_by_not_allowed"),
        "HAVING" => Some("having_not_allowed"),
        "LIMIT" => Some("limit_not_allowed"),
        "OFFSET" => Some("offset_not_allowed"),
        "UNION" => Some("union_not_allowed"),
        "EXISTS" => Some("subquery_not_allowed"),
        "INSERT" => Some("insert_not_allowed"),
        "UPDATE" => Some("update_not_allowed"),
        "DELETE" => Some("delete_not_allowed"),
        "REPLACE" => Some("replace_not_allowed"),
        "CREATE" => Some("create_not_allowed"),
        "DROP" => Some("drop_not_allowed"),
        "ALTER" => Some("alter_not_allowed"),
        "TRUNCATE" => Some("truncate_not_allowed"),
        "GRANT" => Some("grant_not_allowed"),
        "REVOKE" => Some("revoke_not_allowed"),
        _ => None,
    }
}

fn keyword(token: &Token) -> Option<String> {
    match token {
        Token::Ident(word) => Some(word.to_ascii_uppercase()),
        _ => None,
    }
}

fn keyword_at(tokens: &[Token], index: usize) -> Option<String> {
    tokens.get(index).and_then(keyword)
}

fn is_keyword(token: &Token, expected: &str) -> bool {
    matches!(token, Token::Ident(word) if word.eq_ignore_ascii_case(expected))
}

fn find_table<'a>(tables: &[&'a TableSchema], name: &str) -> Option<&'a TableSchema> {
    tables
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(name))
        .copied()
}
