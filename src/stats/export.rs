//! CSV export of scaling statistics

use super::{mean, std_dev, ScalingRow, ScalingTable};
use crate::config::ExperimentKind;
use crate::error::{IoResultExt, Result};
use crate::shape::shape_label;
use std::io::Write;
use std::path::Path;

/// Rows in presentation order: by worker count, or by array and
/// partition shape for partition shape experiments
fn sorted_rows(table: &ScalingTable) -> Vec<&ScalingRow> {
    let mut rows: Vec<&ScalingRow> = table.rows.iter().collect();

    match table.kind {
        ExperimentKind::PartitionShape => rows.sort_by(|a, b| {
            (&a.array_shape, &a.partition_shape).cmp(&(&b.array_shape, &b.partition_shape))
        }),
        _ => rows.sort_by_key(|row| row.nr_workers),
    }

    rows
}

/// Write a scaling table as CSV
///
/// With one repeat per run the raw values are written; otherwise the mean
/// and standard deviation of each series.
pub fn write_csv<W: Write>(table: &ScalingTable, out: &mut W) -> std::io::Result<()> {
    let names = table.series_names();
    let mut header = vec![
        "nr_workers".to_string(),
        "array_shape".to_string(),
        "partition_shape".to_string(),
    ];

    for name in &names {
        if table.count > 1 {
            header.push(format!("mean_{}", name));
            header.push(format!("std_{}", name));
        } else {
            header.push(name.to_string());
        }
    }

    writeln!(out, "{}", header.join(","))?;

    for row in sorted_rows(table) {
        let mut fields = vec![
            row.nr_workers.to_string(),
            shape_label(&row.array_shape),
            shape_label(&row.partition_shape),
        ];

        for name in &names {
            let series = row.series(name).unwrap_or(&[]);
            if table.count > 1 {
                fields.push(mean(series).to_string());
                fields.push(std_dev(series).to_string());
            } else {
                fields.push(series.first().map(f64::to_string).unwrap_or_default());
            }
        }

        writeln!(out, "{}", fields.join(","))?;
    }

    Ok(())
}

/// Write a scaling table to a CSV file
pub fn export_csv(table: &ScalingTable, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).with_path(path)?;
    let mut out = std::io::BufWriter::new(file);
    write_csv(table, &mut out).with_path(path)?;
    out.flush().with_path(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{compute_scaling, Measurement, ScalingModel};

    fn table(durations: &[(u64, Vec<f64>)]) -> ScalingTable {
        let measurements: Vec<Measurement> = durations
            .iter()
            .map(|(nr_workers, duration)| Measurement {
                nr_workers: *nr_workers,
                array_shape: vec![100, 100],
                partition_shape: vec![10, 10],
                duration: duration.clone(),
            })
            .collect();

        compute_scaling(ScalingModel::Strong { nr_time_steps: 1 }, &measurements).unwrap()
    }

    #[test]
    fn test_single_repeat_csv() {
        let table = table(&[(2, vec![50.0]), (1, vec![100.0])]);
        let mut out = Vec::new();
        write_csv(&table, &mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "nr_workers,array_shape,partition_shape,duration,relative_speed_up,relative_efficiency,lups"
        );
        assert_eq!(lines[1], "1,100x100,10x10,100,1,100,100");
        assert_eq!(lines[2], "2,100x100,10x10,50,2,100,200");
    }

    #[test]
    fn test_repeated_csv() {
        let table = table(&[(1, vec![10.0, 14.0]), (2, vec![5.0, 7.0])]);
        let mut out = Vec::new();
        write_csv(&table, &mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert!(lines[0].starts_with("nr_workers,array_shape,partition_shape,mean_duration,std_duration,"));
        assert!(lines[1].starts_with("1,100x100,10x10,12,2,"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaling.csv");
        export_csv(&table(&[(1, vec![1.0])]), &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("nr_workers,"));
    }
}
