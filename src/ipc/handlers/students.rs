use crate::ipc::error::{err, ok};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use crate::store::{NewStudent, StudentPatch, StudentQuery};
use serde_json::json;

fn non_blank_string(
    req: &Request,
    key: &str,
    v: &serde_json::Value,
) -> Result<String, serde_json::Value> {
    let Some(s) = v.as_str() else {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must be a string", key),
            None,
        ));
    };
    let s = s.trim().to_string();
    if s.is_empty() {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must not be blank", key),
            None,
        ));
    }
    Ok(s)
}

fn positive_age(req: &Request, v: &serde_json::Value) -> Result<i64, serde_json::Value> {
    match v.as_i64() {
        Some(age) if age >= 1 => Ok(age),
        _ => Err(err(
            &req.id,
            "bad_params",
            "age must be a positive integer",
            None,
        )),
    }
}

/// Optional string filter: absent, null, or blank all mean "no filter".
fn optional_filter(
    req: &Request,
    key: &str,
) -> Result<Option<String>, serde_json::Value> {
    let Some(v) = req.params.get(key) else {
        return Ok(None);
    };
    if v.is_null() {
        return Ok(None);
    }
    let Some(s) = v.as_str() else {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must be a string or null", key),
            None,
        ));
    };
    let s = s.trim();
    if s.is_empty() {
        Ok(None)
    } else {
        Ok(Some(s.to_string()))
    }
}

fn optional_index(req: &Request, key: &str) -> Result<Option<u64>, serde_json::Value> {
    let Some(v) = req.params.get(key) else {
        return Ok(None);
    };
    if v.is_null() {
        return Ok(None);
    }
    match v.as_u64() {
        Some(n) => Ok(Some(n)),
        None => Err(err(
            &req.id,
            "bad_params",
            format!("{} must be a non-negative integer", key),
            None,
        )),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match helpers::store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let result = store.select(&StudentQuery::default());
    match helpers::unwrap_rows(req, result) {
        Ok(students) => ok(&req.id, json!({ "students": students })),
        Err(resp) => resp,
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match helpers::store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let Some(name_v) = req.params.get("name") else {
        return err(&req.id, "bad_params", "missing name", None);
    };
    let name = match non_blank_string(req, "name", name_v) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(age_v) = req.params.get("age") else {
        return err(&req.id, "bad_params", "missing age", None);
    };
    let age = match positive_age(req, age_v) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(course_v) = req.params.get("course") else {
        return err(&req.id, "bad_params", "missing course", None);
    };
    let course = match non_blank_string(req, "course", course_v) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let result = store.insert(NewStudent { name, age, course });
    match helpers::unwrap_rows(req, result) {
        Ok(rows) => match rows.into_iter().next() {
            Some(student) => ok(&req.id, json!({ "student": student })),
            None => err(&req.id, "store_error", "insert returned no row", None),
        },
        Err(resp) => resp,
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match helpers::store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let student_id = match helpers::required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing/invalid patch", None);
    };

    let mut patch = StudentPatch::default();
    if let Some(v) = patch_obj.get("name") {
        match non_blank_string(req, "patch.name", v) {
            Ok(name) => patch.name = Some(name),
            Err(resp) => return resp,
        }
    }
    if let Some(v) = patch_obj.get("age") {
        match positive_age(req, v) {
            Ok(age) => patch.age = Some(age),
            Err(resp) => return resp,
        }
    }
    if let Some(v) = patch_obj.get("course") {
        match non_blank_string(req, "patch.course", v) {
            Ok(course) => patch.course = Some(course),
            Err(resp) => return resp,
        }
    }
    if patch.is_empty() {
        return err(
            &req.id,
            "bad_params",
            "patch must set at least one of name, age, course",
            None,
        );
    }

    let result = store.update(&student_id, &patch);
    match helpers::unwrap_rows(req, result) {
        Ok(rows) => match rows.into_iter().next() {
            Some(student) => ok(&req.id, json!({ "student": student })),
            None => err(&req.id, "not_found", "student not found", None),
        },
        Err(resp) => resp,
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match helpers::store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let student_id = match helpers::required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let result = store.delete(&student_id);
    match helpers::unwrap_rows(req, result) {
        // Deleting an id that is already gone is not an error.
        Ok(rows) => ok(&req.id, json!({ "deleted": !rows.is_empty() })),
        Err(resp) => resp,
    }
}

fn handle_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match helpers::store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let name_contains = match optional_filter(req, "name") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let course = match optional_filter(req, "course") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let offset = match optional_index(req, "offset") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let limit = match optional_index(req, "limit") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let query = StudentQuery {
        name_contains,
        course,
        offset,
        limit,
    };
    let students = match helpers::unwrap_rows(req, store.select(&query)) {
        Ok(rows) => rows,
        Err(resp) => return resp,
    };

    // Total count ignores pagination so the UI can page through results.
    let total = if query.offset.is_some() || query.limit.is_some() {
        match helpers::unwrap_rows(req, store.select(&query.without_range())) {
            Ok(rows) => rows.len(),
            Err(resp) => return resp,
        }
    } else {
        students.len()
    };

    ok(
        &req.id,
        json!({ "students": students, "totalCount": total }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_list(state, req)),
        "students.create" => Some(handle_create(state, req)),
        "students.update" => Some(handle_update(state, req)),
        "students.delete" => Some(handle_delete(state, req)),
        "students.search" => Some(handle_search(state, req)),
        _ => None,
    }
}
