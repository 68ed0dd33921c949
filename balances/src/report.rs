use crate::{
    errors::ReportError,
    types::{BalanceRow, Network},
};
use std::path::{Path, PathBuf};

pub const INDEX_HEADER: &str = "№";
pub const ADDRESS_HEADER: &str = "Address";

/// File the network's report is written to, separators in the name are
/// replaced so it always lands inside `output_dir`.
pub fn report_path(output_dir: &Path, network: &Network) -> PathBuf {
    let file_name = network.name.replace(['/', '\\'], "_");

    output_dir.join(format!("{file_name}.csv"))
}

/// Writes one CSV row per wallet with a column per token in the network's
/// configured order. Cells are blank when nothing was recorded and hold
/// `error_marker` when the wallet's lookup could not be decoded.
pub fn write_report(
    output_dir: &Path,
    network: &Network,
    rows: &[BalanceRow],
    error_marker: &str,
) -> Result<PathBuf, ReportError> {
    let path = report_path(output_dir, network);
    let mut writer = csv::Writer::from_path(&path)?;

    let header = [INDEX_HEADER, ADDRESS_HEADER]
        .into_iter()
        .chain(network.tokens.iter().map(|t| t.symbol.as_str()));
    writer.write_record(header)?;

    for row in rows {
        let mut record = vec![row.index.to_string(), row.address.clone()];

        record.extend(network.tokens.iter().map(|token| {
            match row.tokens.get(&token.symbol) {
                Some(balance) => balance.clone(),
                None if row.failed.contains(&token.symbol) => error_marker.to_string(),
                None => String::new(),
            }
        }));

        writer.write_record(&record)?;
    }

    writer.flush()?;

    Ok(path)
}
