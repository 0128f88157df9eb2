use crate::models::CanonicalField;

/// Acceptable source-column names per canonical field, most preferred first.
pub const DEFAULT_ALIASES: [(CanonicalField, &[&str]); 13] = [
    (CanonicalField::Campus, &["校区", "校区名称"]),
    (CanonicalField::CourseName, &["课程名称", "课程", "考试课程"]),
    (CanonicalField::CourseCode, &["课程代码", "选课课号"]),
    (CanonicalField::ClassName, &["班级名称", "班级", "班级代码", "行政班级"]),
    (CanonicalField::Teacher, &["任课教师", "教师", "监考教师"]),
    (CanonicalField::Location, &["考试教室", "教室名称", "地点", "考试地点"]),
    (CanonicalField::RawTime, &["考试时间", "时间"]),
    (CanonicalField::Count, &["人数", "学生人数", "考试人数"]),
    (CanonicalField::School, &["开课学院", "学院"]),
    (CanonicalField::StudentSchool, &["学生所在学院", "所在学院"]),
    (CanonicalField::Major, &["专业名称", "专业"]),
    (CanonicalField::Grade, &["年级"]),
    (CanonicalField::Notes, &["备注"]),
];

/// Resolution of one canonical field against a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub field: CanonicalField,
    pub column: Option<String>,
    pub column_index: Option<usize>,
    pub aliases_tried: Vec<String>,
}

impl FieldMapping {
    pub fn is_mapped(&self) -> bool {
        self.column.is_some()
    }
}

/// Column mapping for a whole spreadsheet, fixed once per file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaMapping {
    fields: Vec<FieldMapping>,
}

impl SchemaMapping {
    pub fn get(&self, field: CanonicalField) -> Option<&FieldMapping> {
        self.fields.iter().find(|m| m.field == field)
    }

    pub fn column_index(&self, field: CanonicalField) -> Option<usize> {
        self.get(field).and_then(|m| m.column_index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldMapping> {
        self.fields.iter()
    }

    pub fn mapped_count(&self) -> usize {
        self.fields.iter().filter(|m| m.is_mapped()).count()
    }

    pub fn unmapped(&self) -> Vec<CanonicalField> {
        self.fields
            .iter()
            .filter(|m| !m.is_mapped())
            .map(|m| m.field)
            .collect()
    }
}

/// Ordered-candidate resolution table from canonical field to column aliases.
///
/// Each field resolves independently against the full header: the first alias
/// present wins, and one physical column may satisfy two fields if its name
/// appears in both alias lists.
pub struct SchemaMapper {
    aliases: Vec<(CanonicalField, Vec<String>)>,
}

impl SchemaMapper {
    pub fn new() -> Self {
        let aliases = DEFAULT_ALIASES
            .iter()
            .map(|(field, names)| (*field, names.iter().map(|n| n.to_string()).collect()))
            .collect();

        SchemaMapper { aliases }
    }

    /// Appends an alias after the existing ones for `field`.
    pub fn add_alias(&mut self, field: CanonicalField, alias: String) {
        if let Some((_, names)) = self.aliases.iter_mut().find(|(f, _)| *f == field) {
            if !names.contains(&alias) {
                names.push(alias);
            }
        }
    }

    pub fn aliases(&self, field: CanonicalField) -> &[String] {
        self.aliases
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, names)| names.as_slice())
            .unwrap_or(&[])
    }

    pub fn table(&self) -> &[(CanonicalField, Vec<String>)] {
        &self.aliases
    }

    pub fn resolve(&self, headers: &[String]) -> SchemaMapping {
        let fields = self
            .aliases
            .iter()
            .map(|(field, names)| {
                let hit = names
                    .iter()
                    .find_map(|alias| headers.iter().position(|h| h == alias).map(|idx| (alias, idx)));

                FieldMapping {
                    field: *field,
                    column: hit.map(|(alias, _)| alias.clone()),
                    column_index: hit.map(|(_, idx)| idx),
                    aliases_tried: names.clone(),
                }
            })
            .collect();

        SchemaMapping { fields }
    }
}

impl Default for SchemaMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_first_listed_alias_wins() {
        let mapper = SchemaMapper::new();
        // "课程" comes first in the header but "课程名称" is listed first in the table.
        let mapping = mapper.resolve(&header(&["课程", "课程名称", "考试时间"]));

        let course = mapping.get(CanonicalField::CourseName).unwrap();
        assert_eq!(course.column.as_deref(), Some("课程名称"));
        assert_eq!(course.column_index, Some(1));
    }

    #[test]
    fn test_fallback_alias() {
        let mapper = SchemaMapper::new();
        let mapping = mapper.resolve(&header(&["行政班级", "时间", "考试地点"]));

        assert_eq!(mapping.get(CanonicalField::ClassName).unwrap().column.as_deref(), Some("行政班级"));
        assert_eq!(mapping.column_index(CanonicalField::RawTime), Some(1));
        assert_eq!(mapping.column_index(CanonicalField::Location), Some(2));
    }

    #[test]
    fn test_unmapped_fields_are_not_errors() {
        let mapper = SchemaMapper::new();
        let mapping = mapper.resolve(&header(&["考试时间"]));

        assert_eq!(mapping.mapped_count(), 1);
        assert_eq!(mapping.unmapped().len(), 12);
        let campus = mapping.get(CanonicalField::Campus).unwrap();
        assert!(!campus.is_mapped());
        assert_eq!(campus.aliases_tried, vec!["校区".to_string(), "校区名称".to_string()]);
    }

    #[test]
    fn test_column_shared_by_two_fields() {
        let mut mapper = SchemaMapper::new();
        mapper.add_alias(CanonicalField::StudentSchool, "学院".to_string());
        let mapping = mapper.resolve(&header(&["学院"]));

        assert_eq!(mapping.column_index(CanonicalField::School), Some(0));
        assert_eq!(mapping.column_index(CanonicalField::StudentSchool), Some(0));
    }

    #[test]
    fn test_added_alias_has_lowest_priority() {
        let mut mapper = SchemaMapper::new();
        mapper.add_alias(CanonicalField::RawTime, "考试日期".to_string());
        mapper.add_alias(CanonicalField::RawTime, "考试日期".to_string());
        assert_eq!(mapper.aliases(CanonicalField::RawTime).len(), 3);

        let mapping = mapper.resolve(&header(&["考试日期", "时间"]));
        assert_eq!(mapping.column_index(CanonicalField::RawTime), Some(1));
    }

    #[test]
    fn test_every_field_has_aliases() {
        let mapper = SchemaMapper::default();
        for field in CanonicalField::ALL {
            assert!(!mapper.aliases(field).is_empty(), "{} has no aliases", field);
        }
    }
}
