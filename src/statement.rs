use serde_json::Value;

use crate::{protocol::QueryRequest, render::Table};

/// A query typed by the user, not yet bound to a table.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select { filter: Option<(String, Value)> },
    Insert { row: Vec<Value> },
    Delete { column: String, value: Value },
}

impl Statement {
    /// Builds the wire request against the currently selected table.
    pub fn into_request(self, table: Table) -> QueryRequest {
        match self {
            Statement::Select { filter: None } => QueryRequest::select(table.name()),
            Statement::Select {
                filter: Some((column, value)),
            } => QueryRequest::select_where(table.name(), &column, value),
            Statement::Insert { row } => QueryRequest::insert(table.name(), row),
            Statement::Delete { column, value } => {
                QueryRequest::delete(table.name(), &column, value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::protocol::QueryKind;

    use super::*;

    #[test]
    fn select_binds_table() {
        let request = Statement::Select { filter: None }.into_request(Table::Professors);

        assert_eq!(request.kind(), QueryKind::Select);
        assert_eq!(request.table(), "professors");
        assert_eq!(request.field("payload"), None);
    }

    #[test]
    fn filtered_select_carries_payload() {
        let statement = Statement::Select {
            filter: Some(("stipend".into(), json!(1200))),
        };
        let request = statement.into_request(Table::Students);

        assert_eq!(request.field("payload"), Some(&json!(["stipend", 1200])));
    }

    #[test]
    fn insert_and_delete_requests() {
        let insert = Statement::Insert {
            row: vec![json!(1), json!("Ann")],
        }
        .into_request(Table::Students);
        assert_eq!(insert.kind(), QueryKind::Insert);
        assert_eq!(insert.field("payload"), Some(&json!([1, "Ann"])));

        let delete = Statement::Delete {
            column: "student_id".into(),
            value: json!(1),
        }
        .into_request(Table::Students);
        assert_eq!(delete.kind(), QueryKind::Delete);
        assert_eq!(delete.field("payload"), Some(&json!(["student_id", 1])));
    }
}
