//! Event output: one JSON object per line, or a one-line text summary

use super::detector::MergedClusterEvent;
use crate::error::Result;
use std::io::Write;

/// Labels shown in the text summary
const SUMMARY_TOP_INSIDERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Jsonl,
    Text,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Jsonl => "jsonl",
            OutputFormat::Text => "text",
        }
    }
}

/// `TICKER start–end insiders= trades= value= score= top=`
pub fn summary_line(event: &MergedClusterEvent) -> String {
    let top = event
        .top_insiders
        .iter()
        .take(SUMMARY_TOP_INSIDERS)
        .cloned()
        .collect::<Vec<_>>()
        .join("; ");

    format!(
        "{:<6} {}–{} insiders={} trades={} value=${:.0} score={:.2} top={}",
        event.ticker,
        event.window_start,
        event.window_end,
        event.num_insiders,
        event.num_trades,
        event.total_value,
        event.cluster_score,
        top
    )
}

pub struct EventWriter<W: Write> {
    out: W,
    format: OutputFormat,
    written: usize,
}

impl<W: Write> EventWriter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            written: 0,
        }
    }

    pub fn write_event(&mut self, event: &MergedClusterEvent) -> Result<()> {
        match self.format {
            OutputFormat::Jsonl => {
                let json = serde_json::to_string(event)?;
                writeln!(self.out, "{}", json)?;
            }
            OutputFormat::Text => {
                writeln!(self.out, "{}", summary_line(event))?;
            }
        }
        self.written += 1;
        Ok(())
    }

    pub fn write_all(&mut self, events: &[MergedClusterEvent]) -> Result<usize> {
        for event in events {
            self.write_event(event)?;
        }
        self.flush()?;
        Ok(events.len())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insider_core::roles::KeyRole;
    use chrono::NaiveDate;

    fn event() -> MergedClusterEvent {
        MergedClusterEvent {
            ticker: "ZETA".to_string(),
            window_start: NaiveDate::from_ymd_opt(2024, 2, 20).unwrap(),
            window_end: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            num_trades: 4,
            num_insiders: 3,
            num_total_insiders: 4,
            num_fund_like: 1,
            total_shares: 1_200.0,
            total_value: 84_500.4,
            top_insiders: vec![
                "DOE JANE (Officer, CFO)".to_string(),
                "ROE RICK (Director)".to_string(),
                "POE PAT (Director)".to_string(),
                "LOE LIN (Director)".to_string(),
            ],
            fund_like_insiders: vec!["ACME CAPITAL LP".to_string()],
            role_score: 7,
            num_key_officers: 1,
            has_cfo: true,
            has_gc: false,
            has_ceo: false,
            key_roles: vec![KeyRole::Cfo],
            cluster_score: 30.353,
        }
    }

    #[test]
    fn test_jsonl_output() {
        let mut writer = EventWriter::new(Vec::new(), OutputFormat::Jsonl);
        writer.write_all(&[event(), event()]).unwrap();
        assert_eq!(writer.written(), 2);

        let out = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["ticker"], "ZETA");
        assert_eq!(parsed["window_start"], "2024-02-20");
        assert_eq!(parsed["key_roles"], serde_json::json!(["CFO"]));
        assert_eq!(parsed["num_fund_like"], 1);
    }

    #[test]
    fn test_summary_line() {
        let line = summary_line(&event());
        assert_eq!(
            line,
            "ZETA   2024-02-20–2024-03-01 insiders=3 trades=4 value=$84500 score=30.35 \
             top=DOE JANE (Officer, CFO); ROE RICK (Director); POE PAT (Director)"
        );
    }

    #[test]
    fn test_text_output() {
        let mut writer = EventWriter::new(Vec::new(), OutputFormat::Text);
        writer.write_event(&event()).unwrap();
        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert!(out.starts_with("ZETA   2024-02-20"));
        assert!(out.ends_with('\n'));
    }
}
