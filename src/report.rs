use crate::interpret::Solution;
use crate::table::PreferenceTable;
use csv::{QuoteStyle, WriterBuilder};
use std::io::Write;

/// Write one CSV row per student: name, ranked choices, assigned topic and
/// the rank it had for the student.
pub fn write_report<W: Write>(
    table: &PreferenceTable,
    solution: &Solution,
    writer: W,
) -> Result<(), csv::Error> {
    let width = table
        .students()
        .iter()
        .map(|s| s.preferences.len())
        .max()
        .unwrap_or(0);

    let mut csv_writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);

    let mut header = vec!["student".to_owned()];
    header.extend((1..=width).map(|i| format!("choice{i}")));
    header.extend(["assignment".to_owned(), "rank".to_owned()]);
    csv_writer.write_record(&header)?;

    for student in table.students() {
        let assigned = solution
            .assignments
            .get(&student.name)
            .and_then(|topic| topic.as_deref());

        let mut row = vec![student.name.clone()];
        let choices = student
            .preferences
            .iter()
            .map(|p| table.topic(p.topic).name.clone());
        row.extend(choices.chain(std::iter::repeat(String::new())).take(width));

        let rank = assigned.map(|name| {
            student
                .preferences
                .iter()
                .find(|p| table.topic(p.topic).name == name)
                .map_or_else(|| "unranked".to_owned(), |p| p.rank.to_string())
        });
        row.push(assigned.unwrap_or_default().to_owned());
        row.push(rank.unwrap_or_default());
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpret::Statistics;
    use crate::table::{RawStudent, RawTopic};
    use std::collections::BTreeMap;

    #[test]
    fn report_lists_choices_and_assignment() {
        let table = PreferenceTable::new(
            vec![RawTopic::new("X", 1), RawTopic::new("Y", 1)],
            vec![
                RawStudent::ranked("A", ["X", "Y"]),
                RawStudent::ranked("B", ["X"]),
                RawStudent::ranked("C", ["X"]),
            ],
        )
        .unwrap();
        let solution = Solution {
            assignments: BTreeMap::from([
                ("A".to_owned(), Some("Y".to_owned())),
                ("B".to_owned(), Some("X".to_owned())),
                ("C".to_owned(), None),
            ]),
            objective: 3.0,
            statistics: Statistics::default(),
        };

        let mut buf = Vec::new();
        write_report(&table, &solution, &mut buf).unwrap();

        let expected = "\
\"student\",\"choice1\",\"choice2\",\"assignment\",\"rank\"
\"A\",\"X\",\"Y\",\"Y\",\"2\"
\"B\",\"X\",\"\",\"X\",\"1\"
\"C\",\"X\",\"\",\"\",\"\"
";
        assert_eq!(String::from_utf8(buf).unwrap(), expected);
    }
}
