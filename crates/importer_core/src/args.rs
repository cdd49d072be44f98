use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use importer_logging::importer_warn;

use crate::{BatchConfig, Job};

const JOB_FIELD_SEPARATOR: char = '|';

/// Builds a batch configuration from the process arguments (program name excluded).
///
/// Options look like `--name` or `--name=value`; everything else is a
/// `url|outputPath|transformerPath` job. Problems are logged and skipped,
/// this never fails.
pub fn parse_args<I, S>(args: I) -> BatchConfig
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut config = BatchConfig::default();
    for arg in args {
        let arg = arg.as_ref();
        match arg.strip_prefix("--") {
            Some(option) => apply_option(&mut config, option),
            None => match parse_job(arg) {
                Some(job) => config.jobs.push(job),
                None => {
                    importer_warn!(
                        "Ignoring job {arg:?}: expected url|outputPath|transformerPath"
                    );
                    config.rejected.push(arg.to_string());
                }
            },
        }
    }
    config
}

fn apply_option(config: &mut BatchConfig, option: &str) {
    let (name, value) = match option.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (option, None),
    };

    match name {
        "parallel" => match value.unwrap_or("true") {
            "true" => config.parallel = true,
            "false" => config.parallel = false,
            other => importer_warn!("Invalid value for --parallel: {other:?}"),
        },
        "concurrency" => match value.and_then(|v| v.parse::<NonZeroUsize>().ok()) {
            Some(limit) => config.concurrency = Some(limit),
            None => importer_warn!("Invalid value for --concurrency: {value:?}"),
        },
        "retries" => match value.and_then(|v| v.parse::<u32>().ok()).filter(|n| *n > 0) {
            Some(retries) => config.retry.max_retries = retries,
            None => importer_warn!("Invalid value for --retries: {value:?}"),
        },
        "retry-delay" => match value.and_then(|v| v.parse::<u64>().ok()) {
            Some(ms) => config.retry.delay = Duration::from_millis(ms),
            None => importer_warn!("Invalid value for --retry-delay: {value:?}"),
        },
        "transformer-dir" => match value.filter(|v| !v.is_empty()) {
            Some(dir) => config.transformer_dir = Some(PathBuf::from(dir)),
            None => importer_warn!("Invalid value for --transformer-dir: {value:?}"),
        },
        unknown => importer_warn!("Unknown option --{unknown}"),
    }
}

fn parse_job(token: &str) -> Option<Job> {
    let fields: Vec<&str> = token.split(JOB_FIELD_SEPARATOR).collect();
    match fields.as_slice() {
        [url, output_path, transformer_path]
            if !url.is_empty() && !output_path.is_empty() && !transformer_path.is_empty() =>
        {
            Some(Job::new(*url, *output_path, *transformer_path))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::parse_job;

    #[test]
    fn job_fields_keep_their_order() {
        let job = parse_job("https://a.example|out/a.docx|./t.json").unwrap();
        assert_eq!(job.url, "https://a.example");
        assert_eq!(job.output_path, "out/a.docx");
        assert_eq!(job.transformer_path, "./t.json");
    }

    #[test]
    fn wrong_field_counts_are_rejected() {
        assert!(parse_job("https://a.example").is_none());
        assert!(parse_job("https://a.example|out/a.docx").is_none());
        assert!(parse_job("a|b|c|d").is_none());
        assert!(parse_job("a||c").is_none());
    }
}
