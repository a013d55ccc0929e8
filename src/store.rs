use chrono::{SecondsFormat, Utc};
use rusqlite::{params_from_iter, types::Value, Connection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: String,
    pub name: String,
    pub age: i64,
    pub course: String,
    pub created_at: String,
}

/// Two-field result envelope of the backing store: rows or an error value,
/// never both. The error half is an untyped shape (`message`, `details`,
/// `code`, `hint` all optional) consumed by `normalize::check_store_error`.
#[derive(Debug, Clone, Default)]
pub struct CallResult {
    pub data: Option<Vec<StudentRecord>>,
    pub error: Option<serde_json::Value>,
}

impl CallResult {
    pub fn rows(data: Vec<StudentRecord>) -> Self {
        CallResult {
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: serde_json::Value) -> Self {
        CallResult {
            data: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub age: i64,
    pub course: String,
}

#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub course: Option<String>,
}

impl StudentPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none() && self.course.is_none()
    }
}

/// Filter/sort surface of the store: equality on course, case-insensitive
/// substring on name, newest-first ordering, offset/limit pagination.
#[derive(Debug, Clone, Default)]
pub struct StudentQuery {
    pub name_contains: Option<String>,
    pub course: Option<String>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl StudentQuery {
    pub fn without_range(&self) -> StudentQuery {
        StudentQuery {
            offset: None,
            limit: None,
            ..self.clone()
        }
    }
}

/// Port over the student table so handlers never touch the connection
/// directly and tests can substitute a fake store.
pub trait StudentStore {
    fn select(&self, query: &StudentQuery) -> CallResult;
    fn insert(&self, new: NewStudent) -> CallResult;
    fn update(&self, id: &str, patch: &StudentPatch) -> CallResult;
    fn delete(&self, id: &str) -> CallResult;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        SqliteStore { conn }
    }

    fn select_by_id(&self, id: &str) -> Result<Option<StudentRecord>, rusqlite::Error> {
        use rusqlite::OptionalExtension;
        self.conn
            .query_row(
                "SELECT id, name, age, course, created_at FROM students WHERE id = ?",
                [id],
                row_to_record,
            )
            .optional()
    }
}

fn row_to_record(row: &rusqlite::Row) -> Result<StudentRecord, rusqlite::Error> {
    Ok(StudentRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        course: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn error_shape(e: &rusqlite::Error) -> serde_json::Value {
    let mut shape = json!({ "message": e.to_string() });
    if let Some(code) = e.sqlite_error_code() {
        shape["code"] = json!(format!("{:?}", code));
    }
    shape
}

impl StudentStore for SqliteStore {
    fn select(&self, query: &StudentQuery) -> CallResult {
        let mut sql = String::from("SELECT id, name, age, course, created_at FROM students");
        let mut clauses: Vec<&str> = Vec::new();
        let mut binds: Vec<Value> = Vec::new();

        if let Some(course) = &query.course {
            clauses.push("course = ?");
            binds.push(Value::Text(course.clone()));
        }
        if let Some(term) = &query.name_contains {
            // instr() rather than LIKE so '%' and '_' in the term stay literal.
            clauses.push("instr(lower(name), lower(?)) > 0");
            binds.push(Value::Text(term.clone()));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        // Newest first; rowid breaks ties between same-instant inserts.
        sql.push_str(" ORDER BY created_at DESC, rowid DESC");
        match (query.limit, query.offset) {
            (Some(limit), Some(offset)) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                binds.push(Value::Integer(limit as i64));
                binds.push(Value::Integer(offset as i64));
            }
            (Some(limit), None) => {
                sql.push_str(" LIMIT ?");
                binds.push(Value::Integer(limit as i64));
            }
            (None, Some(offset)) => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                binds.push(Value::Integer(offset as i64));
            }
            (None, None) => {}
        }

        let mut stmt = match self.conn.prepare(&sql) {
            Ok(s) => s,
            Err(e) => return CallResult::failure(error_shape(&e)),
        };
        let rows = stmt
            .query_map(params_from_iter(binds), row_to_record)
            .and_then(|it| it.collect::<Result<Vec<_>, _>>());
        match rows {
            Ok(students) => CallResult::rows(students),
            Err(e) => CallResult::failure(error_shape(&e)),
        }
    }

    fn insert(&self, new: NewStudent) -> CallResult {
        let record = StudentRecord {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            age: new.age,
            course: new.course,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        };
        let res = self.conn.execute(
            "INSERT INTO students(id, name, age, course, created_at) VALUES(?, ?, ?, ?, ?)",
            (
                &record.id,
                &record.name,
                record.age,
                &record.course,
                &record.created_at,
            ),
        );
        match res {
            Ok(_) => CallResult::rows(vec![record]),
            Err(e) => CallResult::failure(error_shape(&e)),
        }
    }

    fn update(&self, id: &str, patch: &StudentPatch) -> CallResult {
        let mut set_parts: Vec<&str> = Vec::new();
        let mut binds: Vec<Value> = Vec::new();

        if let Some(name) = &patch.name {
            set_parts.push("name = ?");
            binds.push(Value::Text(name.clone()));
        }
        if let Some(age) = patch.age {
            set_parts.push("age = ?");
            binds.push(Value::Integer(age));
        }
        if let Some(course) = &patch.course {
            set_parts.push("course = ?");
            binds.push(Value::Text(course.clone()));
        }
        if set_parts.is_empty() {
            // Nothing to write; report the current row so callers still get
            // the not-found signal from an empty data half.
            return match self.select_by_id(id) {
                Ok(Some(record)) => CallResult::rows(vec![record]),
                Ok(None) => CallResult::rows(Vec::new()),
                Err(e) => CallResult::failure(error_shape(&e)),
            };
        }

        let sql = format!("UPDATE students SET {} WHERE id = ?", set_parts.join(", "));
        binds.push(Value::Text(id.to_string()));
        let changed = match self.conn.execute(&sql, params_from_iter(binds)) {
            Ok(n) => n,
            Err(e) => return CallResult::failure(error_shape(&e)),
        };
        if changed == 0 {
            return CallResult::rows(Vec::new());
        }
        match self.select_by_id(id) {
            Ok(Some(record)) => CallResult::rows(vec![record]),
            Ok(None) => CallResult::rows(Vec::new()),
            Err(e) => CallResult::failure(error_shape(&e)),
        }
    }

    fn delete(&self, id: &str) -> CallResult {
        let existing = match self.select_by_id(id) {
            Ok(v) => v,
            Err(e) => return CallResult::failure(error_shape(&e)),
        };
        let Some(record) = existing else {
            return CallResult::rows(Vec::new());
        };
        match self.conn.execute("DELETE FROM students WHERE id = ?", [id]) {
            Ok(_) => CallResult::rows(vec![record]),
            Err(e) => CallResult::failure(error_shape(&e)),
        }
    }
}
