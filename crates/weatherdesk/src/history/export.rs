use csv::WriterBuilder;
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::record::RecordWriter;
use parquet::{
    basic::{LogicalType, Repetition, Type as PhysicalType},
    schema::types::Type,
};
use parquet_derive::ParquetRecordWriter;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook};
use serde::{Deserialize, Serialize};
use slog::info;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;

use crate::history::store::create_artifact;
use crate::{HistoryError, HistoryRecord, HistoryStore, HISTORY_HEADER};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Parquet,
    /// Excel workbook with a styled header row and fitted columns
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Flat parquet row mirroring the history log columns
#[derive(Debug, ParquetRecordWriter)]
pub struct HistoryRow {
    pub city: String,
    pub temp: f64,
    pub humidity: Option<f64>,
    pub conditions: String,
    pub pressure: Option<f64>,
    pub wind_speed: f64,
    pub visibility: f64,
    pub timestamp: String,
}

impl TryFrom<&HistoryRecord> for HistoryRow {
    type Error = HistoryError;

    fn try_from(record: &HistoryRecord) -> Result<Self, Self::Error> {
        Ok(HistoryRow {
            city: record.city.clone(),
            temp: record.temp,
            humidity: record.humidity,
            conditions: record.conditions.clone(),
            pressure: record.pressure,
            wind_speed: record.wind_speed,
            visibility: record.visibility_km,
            timestamp: record.timestamp.format(&Rfc3339)?,
        })
    }
}

fn string_column(name: &str) -> Result<Type, ParquetError> {
    Type::primitive_type_builder(name, PhysicalType::BYTE_ARRAY)
        .with_repetition(Repetition::REQUIRED)
        .with_logical_type(Some(LogicalType::String))
        .build()
}

fn double_column(name: &str, repetition: Repetition) -> Result<Type, ParquetError> {
    Type::primitive_type_builder(name, PhysicalType::DOUBLE)
        .with_repetition(repetition)
        .build()
}

pub fn create_history_schema() -> Result<Type, ParquetError> {
    let fields = vec![
        Arc::new(string_column("city")?),
        Arc::new(double_column("temp", Repetition::REQUIRED)?),
        Arc::new(double_column("humidity", Repetition::OPTIONAL)?),
        Arc::new(string_column("conditions")?),
        Arc::new(double_column("pressure", Repetition::OPTIONAL)?),
        Arc::new(double_column("wind_speed", Repetition::REQUIRED)?),
        Arc::new(double_column("visibility", Repetition::REQUIRED)?),
        Arc::new(string_column("timestamp")?),
    ];
    Type::group_type_builder("weather_history")
        .with_fields(fields)
        .build()
}

impl HistoryStore {
    /// Copies the whole log into a new timestamped file in the backups
    /// folder and returns its path.
    pub fn export(&self, format: ExportFormat) -> Result<PathBuf, HistoryError> {
        let records = self.all_records()?;
        let path = self.artifact_path("weather_history", format.extension())?;

        let written = match format {
            ExportFormat::Csv => write_csv(&path, &records),
            ExportFormat::Parquet => write_parquet(&path, &records),
            ExportFormat::Xlsx => write_xlsx(&path, &records),
        };
        if let Err(e) = written {
            self.discard_artifact(&path);
            return Err(e);
        }

        info!(
            self.logger,
            "exported {} rows to {}",
            records.len(),
            path.display()
        );
        Ok(path)
    }
}

fn write_csv(path: &Path, records: &[HistoryRecord]) -> Result<(), HistoryError> {
    let file = create_artifact(path)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(HISTORY_HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, records: &[HistoryRecord]) -> Result<(), HistoryError> {
    let rows = records
        .iter()
        .map(HistoryRow::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let file = create_artifact(path)?;
    let props = WriterProperties::builder().build();
    let mut writer =
        SerializedFileWriter::new(file, Arc::new(create_history_schema()?), Arc::new(props))?;
    let mut row_group = writer.next_row_group()?;
    rows.as_slice().write_to_row_group(&mut row_group)?;
    row_group.close()?;
    writer.close()?;
    Ok(())
}

pub const XLSX_SHEET_NAME: &str = "Weather History";

fn write_xlsx(path: &Path, records: &[HistoryRecord]) -> Result<(), HistoryError> {
    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xD9E1F2))
        .set_border(FormatBorder::Thin);

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(XLSX_SHEET_NAME)?;
    for (col, name) in (0u16..).zip(HISTORY_HEADER) {
        sheet.write_string_with_format(0, col, name, &header_format)?;
    }

    for (row, record) in (1u32..).zip(records) {
        sheet.write_string(row, 0, &record.city)?;
        sheet.write_number(row, 1, record.temp)?;
        if let Some(humidity) = record.humidity {
            sheet.write_number(row, 2, humidity)?;
        }
        sheet.write_string(row, 3, &record.conditions)?;
        if let Some(pressure) = record.pressure {
            sheet.write_number(row, 4, pressure)?;
        }
        sheet.write_number(row, 5, record.wind_speed)?;
        sheet.write_number(row, 6, record.visibility_km)?;
        sheet.write_string(row, 7, record.timestamp.format(&Rfc3339)?)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    sheet.autofit();

    let file = create_artifact(path)?;
    workbook.save_to_writer(file)?;
    Ok(())
}
