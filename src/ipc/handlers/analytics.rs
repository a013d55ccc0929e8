use crate::ipc::error::ok;
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use crate::stats;
use crate::store::StudentQuery;
use serde_json::json;

fn handle_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match helpers::store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let students = match helpers::unwrap_rows(req, store.select(&StudentQuery::default())) {
        Ok(rows) => rows,
        Err(resp) => return resp,
    };

    let mut age_distribution = serde_json::Map::new();
    for (label, count) in stats::age_distribution(&students) {
        age_distribution.insert(label.to_string(), json!(count));
    }

    ok(
        &req.id,
        json!({
            "totalStudents": students.len(),
            "averageAge": stats::average_age(&students),
            "mostPopularCourse": stats::most_popular_course(&students)
                .unwrap_or_else(|| "N/A".to_string()),
            "courseDistribution": stats::ranked_courses(&students),
            "ageDistribution": serde_json::Value::Object(age_distribution),
            "ageRange": stats::age_range(&students)
                .map(|(min, max)| json!({ "min": min, "max": max })),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.summary" => Some(handle_summary(state, req)),
        _ => None,
    }
}
