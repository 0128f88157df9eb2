use serde::{Deserialize, Serialize};
use std::fmt;

/// The logical attributes every exam record exposes, whatever the source
/// spreadsheet happened to call its columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    Campus,
    CourseName,
    CourseCode,
    ClassName,
    Teacher,
    Location,
    RawTime,
    Count,
    School,
    StudentSchool,
    Major,
    Grade,
    Notes,
}

impl CanonicalField {
    /// Declaration order. The schema mapper and the report both walk fields in this order.
    pub const ALL: [CanonicalField; 13] = [
        CanonicalField::Campus,
        CanonicalField::CourseName,
        CanonicalField::CourseCode,
        CanonicalField::ClassName,
        CanonicalField::Teacher,
        CanonicalField::Location,
        CanonicalField::RawTime,
        CanonicalField::Count,
        CanonicalField::School,
        CanonicalField::StudentSchool,
        CanonicalField::Major,
        CanonicalField::Grade,
        CanonicalField::Notes,
    ];

    /// Key used for this field in the merged dataset.
    pub fn key(self) -> &'static str {
        match self {
            CanonicalField::Campus => "campus",
            CanonicalField::CourseName => "course_name",
            CanonicalField::CourseCode => "course_code",
            CanonicalField::ClassName => "class_name",
            CanonicalField::Teacher => "teacher",
            CanonicalField::Location => "location",
            CanonicalField::RawTime => "raw_time",
            CanonicalField::Count => "count",
            CanonicalField::School => "school",
            CanonicalField::StudentSchool => "student_school",
            CanonicalField::Major => "major",
            CanonicalField::Grade => "grade",
            CanonicalField::Notes => "notes",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    pub fn is_count(self) -> bool {
        matches!(self, CanonicalField::Count)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One parsed spreadsheet row in canonical shape.
///
/// Either the temporal block (`start_timestamp`, `end_timestamp`, `date`)
/// is populated or `parse_error` is, never both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamRecord {
    pub id: String,
    #[serde(rename = "_source_file")]
    pub source_file: String,
    #[serde(rename = "_row_index")]
    pub row_index: usize,

    #[serde(default)]
    pub campus: String,
    #[serde(default, alias = "course")]
    pub course_name: String,
    #[serde(default)]
    pub course_code: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub teacher: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub raw_time: String,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub student_school: String,
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub notes: String,

    #[serde(default)]
    pub start_timestamp: Option<String>,
    #[serde(default)]
    pub end_timestamp: Option<String>,
    #[serde(default)]
    pub duration_minutes: i64,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub parse_error: Option<String>,
}

impl ExamRecord {
    pub fn new(source_file: &str, row_index: usize) -> Self {
        Self {
            id: format!("{}-{}", source_file, row_index),
            source_file: source_file.to_string(),
            row_index,
            ..Default::default()
        }
    }

    /// Assigns a cleaned text value to its field. The count field is not text
    /// and is ignored here.
    pub fn set_text(&mut self, field: CanonicalField, value: String) {
        let slot = match field {
            CanonicalField::Campus => &mut self.campus,
            CanonicalField::CourseName => &mut self.course_name,
            CanonicalField::CourseCode => &mut self.course_code,
            CanonicalField::ClassName => &mut self.class_name,
            CanonicalField::Teacher => &mut self.teacher,
            CanonicalField::Location => &mut self.location,
            CanonicalField::RawTime => &mut self.raw_time,
            CanonicalField::School => &mut self.school,
            CanonicalField::StudentSchool => &mut self.student_school,
            CanonicalField::Major => &mut self.major,
            CanonicalField::Grade => &mut self.grade,
            CanonicalField::Notes => &mut self.notes,
            CanonicalField::Count => return,
        };
        *slot = value;
    }

    pub fn is_parsed(&self) -> bool {
        self.parse_error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_from_file_and_row() {
        let record = ExamRecord::new("schedule.xlsx", 7);
        assert_eq!(record.id, "schedule.xlsx-7");
        assert_eq!(record.row_index, 7);
        assert_eq!(record.count, 0);
        assert!(record.campus.is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let mut record = ExamRecord::new("a.xlsx", 2);
        record.set_text(CanonicalField::CourseName, "大学物理".to_string());
        record.parse_error = Some("Missing time data".to_string());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["_source_file"], "a.xlsx");
        assert_eq!(value["_row_index"], 2);
        assert_eq!(value["course_name"], "大学物理");
        assert!(value["start_timestamp"].is_null());
        assert!(value["end_timestamp"].is_null());
        assert_eq!(value["parse_error"], "Missing time data");
    }

    #[test]
    fn test_legacy_course_key_is_accepted() {
        let json = r#"{"id":"a.xlsx-2","_source_file":"a.xlsx","_row_index":2,"course":"高等数学"}"#;
        let record: ExamRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.course_name, "高等数学");
        assert_eq!(record.duration_minutes, 0);
    }

    #[test]
    fn test_field_keys_are_unique() {
        let mut keys: Vec<_> = CanonicalField::ALL.iter().map(|f| f.key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 13);
    }
}
