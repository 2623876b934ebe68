use crate::cache::LookupCache;
use crate::calc::{
    build_ca_rows, build_integrated_rows, build_regular_rows, table_totals, CaRow, IntegratedRow,
    Reference, RegularRow, TableTotals,
};
use crate::classify::{is_term_three, primary_level, PrimaryLevel};
use crate::comments::{comment_with_fallback, CommentRange};
use crate::division::{final_grade, FinalGrade};
use crate::ingest::{Attribution, Period, Subject};
use crate::marks::Mark;
use crate::scale::{GradingRow, GradingScale};
use crate::setup::Settings;
use crate::source::{collect_student_marks, MarkSource, StudentMarks};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    Ca,
    Bot,
    Mid,
    Eot,
    All,
    Integrated,
}

impl ReportType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CA" => Some(Self::Ca),
            "BOT" => Some(Self::Bot),
            "MID" => Some(Self::Mid),
            "EOT" => Some(Self::Eot),
            "ALL" => Some(Self::All),
            "INTEGRATED" => Some(Self::Integrated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Ca,
    Bot,
    Mid,
    Eot,
    Integrated,
}

impl TableKind {
    fn key(self) -> &'static str {
        match self {
            TableKind::Ca => "ca",
            TableKind::Bot => "bot",
            TableKind::Mid => "mid",
            TableKind::Eot => "eot",
            TableKind::Integrated => "integrated",
        }
    }

    fn default_label(self) -> &'static str {
        match self {
            TableKind::Ca => "Continuous Assessment",
            TableKind::Bot => "Beginning of Term",
            TableKind::Mid => "Mid Term",
            TableKind::Eot => "End of Term",
            TableKind::Integrated => "Integrated Assessment",
        }
    }

    fn for_period(period: Period) -> Self {
        match period {
            Period::Ca => TableKind::Ca,
            Period::Bot => TableKind::Bot,
            Period::Mid => TableKind::Mid,
            Period::Eot => TableKind::Eot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSpec {
    pub kind: TableKind,
    pub label: String,
}

/// Which tables a report shows; decided by report type and level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Ca,
    Single(Period),
    CaAndIntegrated,
    MidAndEot,
    Final,
    NotConfigured,
}

/// Rows the division is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivisionSource {
    Nothing,
    Integrated,
    Period(Period),
}

impl Layout {
    pub fn select(level: PrimaryLevel, report_type: Option<ReportType>) -> Self {
        use ReportType as R;
        match (level, report_type) {
            (PrimaryLevel::Lower, Some(R::Ca)) => Layout::Ca,
            (_, Some(R::Bot)) => Layout::Single(Period::Bot),
            (_, Some(R::Mid)) => Layout::Single(Period::Mid),
            (_, Some(R::Eot)) => Layout::Single(Period::Eot),
            (PrimaryLevel::Lower, Some(R::All | R::Integrated)) => Layout::CaAndIntegrated,
            (PrimaryLevel::Upper, Some(R::All)) => Layout::MidAndEot,
            (PrimaryLevel::Upper, Some(R::Integrated)) => Layout::Final,
            _ => Layout::NotConfigured,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Layout::Ca => "ca",
            Layout::Single(_) => "single",
            Layout::CaAndIntegrated => "caAndIntegrated",
            Layout::MidAndEot => "midAndEot",
            Layout::Final => "final",
            Layout::NotConfigured => "notConfigured",
        }
    }

    pub fn tables(self, final_label: &str) -> Vec<TableSpec> {
        let spec = |kind: TableKind| TableSpec {
            kind,
            label: kind.default_label().to_string(),
        };
        match self {
            Layout::Ca => vec![spec(TableKind::Ca)],
            Layout::Single(p) => vec![spec(TableKind::for_period(p))],
            Layout::CaAndIntegrated => vec![spec(TableKind::Ca), spec(TableKind::Integrated)],
            Layout::MidAndEot => vec![spec(TableKind::Mid), spec(TableKind::Eot)],
            Layout::Final => vec![TableSpec {
                kind: TableKind::Eot,
                label: final_label.to_string(),
            }],
            Layout::NotConfigured => Vec::new(),
        }
    }

    pub fn division_source(self) -> DivisionSource {
        match self {
            Layout::Ca | Layout::NotConfigured => DivisionSource::Nothing,
            Layout::Single(p) => DivisionSource::Period(p),
            Layout::CaAndIntegrated => DivisionSource::Integrated,
            Layout::MidAndEot | Layout::Final => DivisionSource::Period(Period::Eot),
        }
    }

    fn uses_integrated(self) -> bool {
        self == Layout::CaAndIntegrated
    }
}

impl Serialize for Layout {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

/// Subject and teacher resolution for one report run. The catalogues sent
/// with the run are authoritative and refresh the shared caches; the caches
/// only answer for ids the run does not name.
pub struct Directory<'a> {
    subject_cache: &'a LookupCache<String, Subject>,
    teacher_cache: &'a LookupCache<String, String>,
    subjects: HashMap<String, Subject>,
    teachers: HashMap<String, String>,
}

impl<'a> Directory<'a> {
    pub fn new(
        subject_cache: &'a LookupCache<String, Subject>,
        teacher_cache: &'a LookupCache<String, String>,
        subjects: Vec<Subject>,
        teachers: Vec<(String, String)>,
    ) -> Self {
        let subjects: HashMap<String, Subject> =
            subjects.into_iter().map(|s| (s.id.clone(), s)).collect();
        let teachers: HashMap<String, String> = teachers.into_iter().collect();
        for (id, subject) in &subjects {
            subject_cache.insert(id.clone(), subject.clone());
        }
        for (id, initials) in &teachers {
            teacher_cache.insert(id.clone(), initials.clone());
        }
        Self {
            subject_cache,
            teacher_cache,
            subjects,
            teachers,
        }
    }
}

impl Reference for Directory<'_> {
    fn subject(&self, id: &str) -> Subject {
        self.subjects
            .get(id)
            .cloned()
            .or_else(|| self.subject_cache.get(&id.to_string()))
            .unwrap_or_else(|| Subject::unknown(id))
    }

    fn initials(&self, attribution: &Attribution) -> String {
        if let Some(initials) = &attribution.initials {
            return initials.clone();
        }
        attribution
            .teacher_id
            .as_ref()
            .and_then(|id| {
                self.teachers
                    .get(id)
                    .cloned()
                    .or_else(|| self.teacher_cache.get(id))
            })
            .unwrap_or_default()
    }
}

/// Per-run inputs shared by every student.
pub struct ReportContext<'a> {
    pub class_name: String,
    pub term: Option<String>,
    pub report_type_label: String,
    pub level: PrimaryLevel,
    pub layout: Layout,
    pub scale: GradingScale,
    pub class_teacher_ranges: Vec<CommentRange>,
    pub head_teacher_ranges: Vec<CommentRange>,
    pub settings: &'a Settings,
}

impl<'a> ReportContext<'a> {
    pub fn new(
        class_name: &str,
        term: Option<&str>,
        report_type: &str,
        grading_rows: &[GradingRow],
        class_teacher_ranges: Vec<CommentRange>,
        head_teacher_ranges: Vec<CommentRange>,
        settings: &'a Settings,
    ) -> Self {
        let level = primary_level(class_name);
        let layout = Layout::select(level, ReportType::parse(report_type));
        let scale = GradingScale::new(grading_rows);
        if scale.is_empty() && layout != Layout::NotConfigured {
            tracing::warn!(class_name, "no grading scale supplied; aggregates unavailable");
        }
        Self {
            class_name: class_name.to_string(),
            term: term.map(str::to_string),
            report_type_label: report_type.trim().to_ascii_uppercase(),
            level,
            layout,
            scale,
            class_teacher_ranges,
            head_teacher_ranges,
            settings,
        }
    }

    fn term_three(&self) -> bool {
        self.term.as_deref().map(is_term_three).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentInput {
    pub student_id: String,
    pub student_name: String,
    pub class_teacher_comment: Option<String>,
    pub head_teacher_comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReportData {
    pub student_id: String,
    pub student_name: String,
    pub class_name: String,
    pub term: Option<String>,
    pub report_type: String,
    pub level: PrimaryLevel,
    pub layout: Layout,
    pub tables: Vec<TableSpec>,
    pub ca: Vec<CaRow>,
    pub bot: Vec<RegularRow>,
    pub mid: Vec<RegularRow>,
    pub eot: Vec<RegularRow>,
    pub integrated: Vec<IntegratedRow>,
    pub final_grade: FinalGrade,
    pub class_teacher_comment: Option<String>,
    pub head_teacher_comment: Option<String>,
    pub promotion: Option<String>,
    pub totals: BTreeMap<&'static str, TableTotals>,
    pub failed_periods: Vec<Period>,
}

fn regular_values(rows: &[RegularRow]) -> Vec<Option<f64>> {
    rows.iter()
        .map(|r| r.score.and_then(Mark::countable))
        .collect()
}

pub fn assemble_student_report(
    ctx: &ReportContext<'_>,
    directory: &dyn Reference,
    student: &StudentInput,
    marks: &StudentMarks,
) -> StudentReportData {
    let mut report = StudentReportData {
        student_id: student.student_id.clone(),
        student_name: student.student_name.clone(),
        class_name: ctx.class_name.clone(),
        term: ctx.term.clone(),
        report_type: ctx.report_type_label.clone(),
        level: ctx.level,
        layout: ctx.layout,
        tables: ctx.layout.tables(&ctx.settings.reports.final_table_label),
        ca: Vec::new(),
        bot: Vec::new(),
        mid: Vec::new(),
        eot: Vec::new(),
        integrated: Vec::new(),
        final_grade: FinalGrade::not_applicable(),
        class_teacher_comment: None,
        head_teacher_comment: None,
        promotion: None,
        totals: BTreeMap::new(),
        failed_periods: marks.failed.clone(),
    };
    if ctx.layout == Layout::NotConfigured {
        return report;
    }

    report.ca = build_ca_rows(&marks.ca, directory);
    report.bot = build_regular_rows(&marks.bot, &ctx.scale, directory);
    report.mid = build_regular_rows(&marks.mid, &ctx.scale, directory);
    report.eot = build_regular_rows(&marks.eot, &ctx.scale, directory);
    if ctx.layout.uses_integrated() {
        report.integrated =
            build_integrated_rows(&report.ca, &report.mid, &report.eot, &ctx.scale, directory);
    }

    let bands = &ctx.settings.division.bands;
    report.final_grade = match ctx.layout.division_source() {
        DivisionSource::Nothing => FinalGrade::not_applicable(),
        DivisionSource::Integrated => final_grade(&report.integrated, bands),
        DivisionSource::Period(Period::Bot) => final_grade(&report.bot, bands),
        DivisionSource::Period(Period::Mid) => final_grade(&report.mid, bands),
        DivisionSource::Period(_) => final_grade(&report.eot, bands),
    };

    let aggs = report.final_grade.aggs;
    let placeholder = ctx.settings.reports.fallback_comment.as_str();
    report.class_teacher_comment = Some(comment_with_fallback(
        aggs,
        &ctx.class_teacher_ranges,
        student.class_teacher_comment.as_deref(),
        placeholder,
    ));
    report.head_teacher_comment = Some(comment_with_fallback(
        aggs,
        &ctx.head_teacher_ranges,
        student.head_teacher_comment.as_deref(),
        placeholder,
    ));

    let promoted = ctx.term_three()
        && (ctx.level == PrimaryLevel::Lower || report.final_grade.grade.is_passing());
    if promoted {
        report.promotion = Some(ctx.settings.reports.promotion_text.clone());
    }

    for table in &report.tables {
        let totals = match table.kind {
            TableKind::Ca => table_totals(report.ca.iter().map(|r| r.total)),
            TableKind::Bot => table_totals(regular_values(&report.bot)),
            TableKind::Mid => table_totals(regular_values(&report.mid)),
            TableKind::Eot => table_totals(regular_values(&report.eot)),
            TableKind::Integrated => table_totals(report.integrated.iter().map(|r| r.average)),
        };
        report.totals.insert(table.kind.key(), totals);
    }

    tracing::debug!(
        student_id = %report.student_id,
        layout = report.layout.key(),
        aggs = ?report.final_grade.aggs,
        division = report.final_grade.grade.label(),
        "assembled student report"
    );
    report
}

/// Collects and assembles reports for every student. Students are
/// independent: one student's failed fetches never touch another's report.
pub fn assemble_batch(
    ctx: &ReportContext<'_>,
    directory: &dyn Reference,
    source: &dyn MarkSource,
    students: &[StudentInput],
) -> Vec<StudentReportData> {
    students
        .iter()
        .map(|student| {
            let marks = if ctx.layout == Layout::NotConfigured {
                StudentMarks::default()
            } else {
                collect_student_marks(source, &student.student_id)
            };
            assemble_student_report(ctx, directory, student, &marks)
        })
        .collect()
}
