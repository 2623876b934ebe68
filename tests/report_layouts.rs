mod test_support;

use serde_json::{json, Value};
use test_support::{error_code, grading_rows, request, request_ok, scores, spawn_sidecar, subjects};

fn table_kinds(report: &Value) -> Vec<String> {
    report
        .get("tables")
        .and_then(|v| v.as_array())
        .map(|tables| {
            tables
                .iter()
                .filter_map(|t| t.get("kind").and_then(|v| v.as_str()).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn student_report(class_name: &str, term: &str, report_type: &str, student: Value) -> Value {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "reports.student",
        json!({
            "className": class_name,
            "term": term,
            "reportType": report_type,
            "gradingRows": grading_rows(),
            "subjects": subjects(),
            "teachers": [{ "id": "t-9", "initials": "MK" }],
            "student": student
        }),
    )
}

#[test]
fn lower_primary_all_merges_ca_mid_and_eot() {
    let report = student_report(
        "P.2 East",
        "Term 3",
        "ALL",
        json!({
            "studentId": "stu-1",
            "ca": [{
                "subjectId": "s1",
                "classwork": 30, "homework": 20, "organisation": 10,
                "participation": 10, "selfManagement": 10,
                "initials": "CA"
            }],
            "mid": [{ "subjectId": "s1", "score": -1, "teacherId": "t-9" }],
            "eot": [{ "subjectId": "s1", "score": "70" }]
        }),
    );

    assert_eq!(report.get("level").and_then(|v| v.as_str()), Some("lower"));
    assert_eq!(report.get("layout").and_then(|v| v.as_str()), Some("caAndIntegrated"));
    assert_eq!(table_kinds(&report), vec!["ca", "integrated"]);

    let ca = &report["ca"][0];
    assert_eq!(ca.get("total").and_then(|v| v.as_i64()), Some(80));

    let row = &report["integrated"][0];
    assert_eq!(row.get("ca").and_then(|v| v.as_i64()), Some(80));
    assert_eq!(row.get("mid").and_then(|v| v.as_i64()), Some(-1));
    assert_eq!(row.get("total").and_then(|v| v.as_i64()), Some(150));
    assert_eq!(row.get("average").and_then(|v| v.as_i64()), Some(50));
    assert_eq!(row.get("aggregate").and_then(|v| v.as_i64()), Some(4));
    assert_eq!(row["display"].get("mid").and_then(|v| v.as_str()), Some("-"));
    // EOT has no initials, so MID's teacher lookup wins over CA.
    assert_eq!(row.get("initials").and_then(|v| v.as_str()), Some("MK"));

    assert_eq!(report["finalGrade"].get("aggs").and_then(|v| v.as_i64()), Some(4));
    assert_eq!(report["finalGrade"].get("grade").and_then(|v| v.as_str()), Some("DIV I"));
    assert_eq!(
        report["totals"]["integrated"].get("totalMarks").and_then(|v| v.as_i64()),
        Some(50)
    );
    assert_eq!(
        report["totals"]["ca"].get("subjectCount").and_then(|v| v.as_u64()),
        Some(1)
    );
    assert_eq!(
        report.get("promotion").and_then(|v| v.as_str()),
        Some("Promoted to next class")
    );
}

#[test]
fn lower_primary_ca_has_no_division() {
    let report = student_report(
        "Baby Class",
        "Term 1",
        "CA",
        json!({
            "studentId": "stu-1",
            "ca": [{ "subjectId": "s1", "cw": 10, "hw": "-1", "sp": "5" }]
        }),
    );
    assert_eq!(table_kinds(&report), vec!["ca"]);
    let ca = &report["ca"][0];
    assert_eq!(ca.get("total").and_then(|v| v.as_i64()), Some(15));
    assert_eq!(ca["display"].get("homework").and_then(|v| v.as_str()), Some("-"));
    assert_eq!(ca["display"].get("organisation").and_then(|v| v.as_str()), Some(""));
    assert_eq!(report["finalGrade"].get("grade").and_then(|v| v.as_str()), Some("N/A"));
    assert!(report["finalGrade"].get("aggs").map(|v| v.is_null()).unwrap_or(false));
}

#[test]
fn upper_primary_all_shows_mid_and_eot_graded_on_eot() {
    let report = student_report(
        "P7",
        "third term",
        "all",
        json!({
            "studentId": "stu-1",
            "mid": scores([10.0, 10.0, 10.0, 10.0, 10.0, 10.0]),
            "eotRows": { "data": scores([85.0, 85.0, 85.0, 85.0, 85.0, 85.0]) }
        }),
    );
    assert_eq!(report.get("level").and_then(|v| v.as_str()), Some("upper"));
    assert_eq!(report.get("reportType").and_then(|v| v.as_str()), Some("ALL"));
    assert_eq!(table_kinds(&report), vec!["mid", "eot"]);
    assert_eq!(report["finalGrade"].get("aggs").and_then(|v| v.as_i64()), Some(12));
    assert_eq!(report["finalGrade"].get("grade").and_then(|v| v.as_str()), Some("DIV I"));
    assert_eq!(
        report.get("promotion").and_then(|v| v.as_str()),
        Some("Promoted to next class")
    );
    assert!(report
        .get("integrated")
        .and_then(|v| v.as_array())
        .map(|a| a.is_empty())
        .unwrap_or(false));
}

#[test]
fn upper_primary_integrated_is_a_single_final_table() {
    let report = student_report(
        "Primary Six",
        "Term 3",
        "INTEGRATED",
        json!({
            "studentId": "stu-1",
            "eot": scores([10.0, 10.0, 10.0, 10.0, 10.0, 10.0])
        }),
    );
    assert_eq!(report.get("layout").and_then(|v| v.as_str()), Some("final"));
    let tables = report.get("tables").and_then(|v| v.as_array()).expect("tables");
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].get("kind").and_then(|v| v.as_str()), Some("eot"));
    assert_eq!(tables[0].get("label").and_then(|v| v.as_str()), Some("final"));
    // 54 is outside every band, so there is nothing to promote on.
    assert_eq!(report["finalGrade"].get("grade").and_then(|v| v.as_str()), Some("N/A"));
    assert!(report.get("promotion").map(|v| v.is_null()).unwrap_or(false));
}

#[test]
fn unknown_report_type_is_not_configured() {
    let report = student_report(
        "P5",
        "Term 1",
        "WEEKLY",
        json!({
            "studentId": "stu-1",
            "eot": scores([85.0, 85.0, 85.0, 85.0, 85.0, 85.0])
        }),
    );
    assert_eq!(report.get("layout").and_then(|v| v.as_str()), Some("notConfigured"));
    assert!(table_kinds(&report).is_empty());
    assert!(report.get("eot").and_then(|v| v.as_array()).map(|a| a.is_empty()).unwrap_or(false));
    assert!(report.get("classTeacherComment").map(|v| v.is_null()).unwrap_or(false));
}

#[test]
fn report_requests_validate_their_params() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let missing_class = request(
        &mut stdin,
        &mut reader,
        "1",
        "reports.student",
        json!({ "reportType": "EOT", "student": { "studentId": "a" } }),
    );
    assert_eq!(error_code(&missing_class), Some("bad_params"));

    let missing_id = request(
        &mut stdin,
        &mut reader,
        "2",
        "reports.student",
        json!({ "className": "P5", "reportType": "EOT", "student": { "name": "x" } }),
    );
    assert_eq!(error_code(&missing_id), Some("bad_params"));

    let duplicate = request(
        &mut stdin,
        &mut reader,
        "3",
        "reports.batch",
        json!({
            "className": "P5",
            "reportType": "EOT",
            "students": [{ "studentId": "a" }, { "studentId": "a" }]
        }),
    );
    assert_eq!(error_code(&duplicate), Some("bad_params"));
    assert_eq!(
        duplicate["error"]["details"].get("studentId").and_then(|v| v.as_str()),
        Some("a")
    );

    let not_array = request(
        &mut stdin,
        &mut reader,
        "4",
        "reports.batch",
        json!({ "className": "P5", "reportType": "EOT", "students": {} }),
    );
    assert_eq!(error_code(&not_array), Some("bad_params"));
}

#[test]
fn each_run_uses_the_catalogue_it_was_sent() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let run = |catalogue: Value, teachers: Value| {
        json!({
            "className": "P6",
            "reportType": "EOT",
            "gradingRows": grading_rows(),
            "subjects": catalogue,
            "teachers": teachers,
            "student": {
                "studentId": "stu-1",
                "eot": [{ "subjectId": "s1", "score": 80, "teacherId": "t1" }]
            }
        })
    };

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "reports.student",
        run(
            json!([{ "id": "s1", "name": "Art", "isCompulsory": false }]),
            json!([{ "id": "t1", "initials": "OLD" }]),
        ),
    );
    assert_eq!(first["eot"][0].get("isCompulsory").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(first["eot"][0].get("initials").and_then(|v| v.as_str()), Some("OLD"));

    let second = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "reports.student",
        run(
            json!([{ "id": "s1", "name": "Maths", "isCompulsory": true }]),
            json!([{ "id": "t1", "initials": "NEW" }]),
        ),
    );
    let row = &second["eot"][0];
    assert_eq!(row.get("subjectName").and_then(|v| v.as_str()), Some("Maths"));
    assert_eq!(row.get("isCompulsory").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(row.get("aggregate").and_then(|v| v.as_i64()), Some(2));
    assert_eq!(row.get("initials").and_then(|v| v.as_str()), Some("NEW"));
    assert_eq!(second["finalGrade"].get("aggs").and_then(|v| v.as_i64()), Some(2));

    // A run without a catalogue falls back to what the last run sent.
    let third = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "reports.student",
        run(json!([]), json!([])),
    );
    assert_eq!(third["eot"][0].get("subjectName").and_then(|v| v.as_str()), Some("Maths"));
    assert_eq!(third["eot"][0].get("initials").and_then(|v| v.as_str()), Some("NEW"));
}
