//! Translation of bound run arguments into engine command-line flags.

use super::{ParamValue, ParameterSpec, RunArguments};

/// Builds the flag tokens for every bound parameter, in declaration order.
///
/// Unset parameters produce nothing, so the engine sees only options that
/// were explicitly set and applies its own defaults for the rest.
pub fn engine_flags(args: &RunArguments) -> Vec<String> {
    args.iter()
        .flat_map(|(spec, value)| flag_tokens(spec, value))
        .collect()
}

/// Tokens for a single parameter value.
///
/// Booleans are presence-only: `true` emits the bare flag, `false` emits
/// nothing. Every other type emits the flag followed by one value token.
pub fn flag_tokens(spec: &ParameterSpec, value: &ParamValue) -> Vec<String> {
    let value_token = match value {
        ParamValue::Bool(true) => return vec![spec.flag()],
        ParamValue::Bool(false) => return Vec::new(),
        ParamValue::File(path) | ParamValue::Dir(path) => path.to_string(),
        ParamValue::Str(s) => s.clone(),
        ParamValue::Int(i) => i.to_string(),
        ParamValue::Float(f) => format_float(*f),
    };
    vec![spec.flag(), value_token]
}

// Integral floats keep a trailing ".0" so the engine parses them as decimals.
fn format_float(value: f64) -> String {
    format!("{:?}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{lookup, PathRef};

    fn scenario_args() -> RunArguments {
        RunArguments::new()
            .with("input", ParamValue::File(PathRef::parse("sample.csv")))
            .unwrap()
            .with("outdir", ParamValue::Dir(PathRef::parse("s3://bucket/out")))
            .unwrap()
            .with("amplicon", ParamValue::Bool(true))
            .unwrap()
            .with("amplicon_read_count", ParamValue::Int(500))
            .unwrap()
    }

    #[test]
    fn test_amplicon_scenario() {
        let flags = engine_flags(&scenario_args());
        assert_eq!(
            flags,
            vec![
                "--input",
                "sample.csv",
                "--outdir",
                "s3://bucket/out",
                "--amplicon",
                "--amplicon_read_count",
                "500",
            ]
        );
        for absent in ["--target_capture", "--metagenome", "--wholegenome"] {
            assert!(!flags.iter().any(|f| f == absent), "{absent} must be omitted");
        }
    }

    #[test]
    fn test_false_boolean_emits_nothing() {
        let args = RunArguments::new()
            .with("metagenome", ParamValue::Bool(false))
            .unwrap()
            .with("metagenome_gc_bias", ParamValue::Bool(true))
            .unwrap();
        let flags = engine_flags(&args);
        assert_eq!(flags, vec!["--metagenome_gc_bias"]);
        assert!(!flags.iter().any(|f| f == "true" || f == "false"));
    }

    #[test]
    fn test_empty_arguments_emit_no_flags() {
        assert!(engine_flags(&RunArguments::new()).is_empty());
    }

    #[test]
    fn test_order_independent_of_insertion() {
        let a = RunArguments::new()
            .with("ncbidownload_section", ParamValue::Str("genbank".into()))
            .unwrap()
            .with("wholegenome_error_rate", ParamValue::Float(0.05))
            .unwrap()
            .with("email", ParamValue::Str("me@example.org".into()))
            .unwrap();
        let b = RunArguments::new()
            .with("email", ParamValue::Str("me@example.org".into()))
            .unwrap()
            .with("wholegenome_error_rate", ParamValue::Float(0.05))
            .unwrap()
            .with("ncbidownload_section", ParamValue::Str("genbank".into()))
            .unwrap();
        assert_eq!(engine_flags(&a), engine_flags(&b));
        assert_eq!(engine_flags(&a)[0], "--email");
        assert_eq!(engine_flags(&a), engine_flags(&a.clone()));
    }

    #[test]
    fn test_float_and_file_serialization() {
        let shape = lookup("target_capture_fshape").unwrap();
        assert_eq!(
            flag_tokens(shape, &ParamValue::Float(6.0)),
            vec!["--target_capture_fshape", "6.0"]
        );
        let fasta = lookup("fasta").unwrap();
        assert_eq!(
            flag_tokens(fasta, &ParamValue::File(PathRef::parse("latch:///refs/genome.fa"))),
            vec!["--fasta", "latch:///refs/genome.fa"]
        );
    }

    #[test]
    fn test_flag_present_iff_value_set() {
        let args = scenario_args();
        let flags = engine_flags(&args);
        for spec in crate::params::parameters() {
            let present = flags.iter().any(|f| *f == spec.flag());
            assert_eq!(present, args.get(spec.name).is_some(), "{}", spec.name);
        }
    }
}
