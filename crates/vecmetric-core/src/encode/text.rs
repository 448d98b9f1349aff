use std::fmt::Write;

use bytes::{Bytes, BytesMut};

use crate::error::{MetricError, Result};
use crate::registry::{FamilySnapshot, Sample};

use super::Encoder;

/// Prometheus text exposition format, version 0.0.4.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextEncoder;

impl TextEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder for TextEncoder {
    fn content_type(&self) -> &'static str {
        "text/plain; version=0.0.4; charset=utf-8"
    }

    fn encode(&self, families: &[FamilySnapshot]) -> Result<Bytes> {
        let mut out = BytesMut::with_capacity(1024);
        for family in families {
            render_family(family, &mut out)
                .map_err(|e| MetricError::Internal(format!("encode {}: {e}", family.name)))?;
        }
        Ok(out.freeze())
    }
}

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v == f64::INFINITY {
        "+Inf".into()
    } else if v == f64::NEG_INFINITY {
        "-Inf".into()
    } else {
        v.to_string()
    }
}

/// `{k="v",...}` for the given pairs, or nothing when there are none.
fn label_set<'a>(labels: impl Iterator<Item = (&'a str, String)>) -> String {
    let body = labels
        .map(|(k, v)| format!("{k}=\"{}\"", escape_label(&v)))
        .collect::<Vec<_>>()
        .join(",");
    if body.is_empty() {
        body
    } else {
        format!("{{{body}}}")
    }
}

fn pairs<'a>(names: &'a [String], values: &'a [String]) -> impl Iterator<Item = (&'a str, String)> + 'a {
    names.iter().map(String::as_str).zip(values.iter().cloned())
}

fn render_family(family: &FamilySnapshot, out: &mut BytesMut) -> std::fmt::Result {
    let name = &family.name;
    if !family.help.is_empty() {
        writeln!(out, "# HELP {name} {}", escape_help(&family.help))?;
    }
    writeln!(out, "# TYPE {name} {}", family.kind.as_str())?;

    for series in &family.series {
        let (names, values) = (&family.label_names, &series.label_values);

        match &series.sample {
            Sample::Value(v) => {
                writeln!(out, "{name}{} {}", label_set(pairs(names, values)), format_value(*v))?;
            }
            Sample::Histogram { buckets, count, sum } => {
                for (le, n) in buckets {
                    let set = label_set(pairs(names, values).chain([("le", format_value(*le))]));
                    writeln!(out, "{name}_bucket{set} {n}")?;
                }
                let set = label_set(pairs(names, values).chain([("le", "+Inf".to_string())]));
                writeln!(out, "{name}_bucket{set} {count}")?;

                let plain = label_set(pairs(names, values));
                writeln!(out, "{name}_sum{plain} {}", format_value(*sum))?;
                writeln!(out, "{name}_count{plain} {count}")?;
            }
        }
    }
    Ok(())
}
