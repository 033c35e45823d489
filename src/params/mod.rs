//! Parameter registry for the nf-core/readsimulator pipeline.
//!
//! The registry is a fixed, order-preserving table of every option the
//! pipeline accepts. Declaration order is significant: it is the order in
//! which flags are emitted on the engine command line.
//!
//! Defaults recorded here are informational (used when rendering the
//! parameter form). The runtime never re-applies them; an option that is not
//! set is omitted and the engine falls back to its own defaults.

pub mod flags;
pub mod value;

use serde::Serialize;

pub use flags::{engine_flags, flag_tokens};
pub use value::{ParamValue, PathRef, RunArguments};

/// Declared type of a pipeline parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    /// Reference to a single file (local path or remote URI).
    File,
    /// Reference to a directory (local path or remote URI).
    Dir,
    Str,
    Bool,
    Int,
    Float,
}

impl ParamType {
    /// Short human-readable name, used in error messages and listings.
    pub fn display_name(&self) -> &'static str {
        match self {
            ParamType::File => "file",
            ParamType::Dir => "directory",
            ParamType::Str => "string",
            ParamType::Bool => "boolean",
            ParamType::Int => "integer",
            ParamType::Float => "float",
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Schema default for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamDefault {
    Str(&'static str),
    Int(i64),
    Float(f64),
}

impl std::fmt::Display for ParamDefault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamDefault::Str(s) => write!(f, "{}", s),
            ParamDefault::Int(i) => write!(f, "{}", i),
            ParamDefault::Float(v) => write!(f, "{:?}", v),
        }
    }
}

/// One entry of the parameter registry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterSpec {
    /// Unique parameter name; also the engine flag name.
    pub name: &'static str,
    /// Declared value type.
    #[serde(rename = "type")]
    pub kind: ParamType,
    /// Whether the parameter may be left unset.
    pub optional: bool,
    /// Whether the parameter designates a pipeline output location.
    pub output: bool,
    /// Schema default shown in the rendered form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<ParamDefault>,
    /// Section heading that starts at this parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<&'static str>,
    pub description: &'static str,
}

impl ParameterSpec {
    const fn new(name: &'static str, kind: ParamType, description: &'static str) -> Self {
        Self {
            name,
            kind,
            optional: true,
            output: false,
            default_value: None,
            section: None,
            description,
        }
    }

    const fn required(mut self) -> Self {
        self.optional = false;
        self
    }

    const fn output(mut self) -> Self {
        self.output = true;
        self
    }

    const fn with_default(mut self, default: ParamDefault) -> Self {
        self.default_value = Some(default);
        self
    }

    const fn in_section(mut self, title: &'static str) -> Self {
        self.section = Some(title);
        self
    }

    /// Engine flag for this parameter (`--<name>`).
    pub fn flag(&self) -> String {
        format!("--{}", self.name)
    }
}

use ParamDefault as D;
use ParamType as T;

static PARAMETERS: &[ParameterSpec] = &[
    // Input/output options
    ParameterSpec::new(
        "input",
        T::File,
        "Path to comma-separated file containing information about the samples in the experiment.",
    )
    .required()
    .in_section("Input/output options"),
    ParameterSpec::new(
        "outdir",
        T::Dir,
        "The output directory where the results will be saved. You have to use absolute paths to storage on Cloud infrastructure.",
    )
    .required()
    .output(),
    ParameterSpec::new("email", T::Str, "Email address for completion summary."),
    ParameterSpec::new(
        "multiqc_title",
        T::Str,
        "MultiQC report title. Printed as page header, used for filename if not otherwise specified.",
    ),
    // Simulation options
    ParameterSpec::new("amplicon", T::Bool, "Option to simulate amplicon sequencing reads.")
        .in_section("Simulation options"),
    ParameterSpec::new(
        "target_capture",
        T::Bool,
        "Option to simulate target capture sequencing reads.",
    ),
    ParameterSpec::new("metagenome", T::Bool, "Option to simulate metagenomic sequencing reads."),
    ParameterSpec::new("wholegenome", T::Bool, "Option to simulate wholegenomic sequencing reads."),
    // Amplicon options
    ParameterSpec::new("amplicon_fw_primer", T::Str, "Forward primer to use with crabs_insilicopcr.")
        .with_default(D::Str("GTCGGTAAAACTCGTGCCAGC"))
        .in_section("Amplicon options"),
    ParameterSpec::new("amplicon_rv_primer", T::Str, "Reverse primer to use with crabs_insilicopcr.")
        .with_default(D::Str("CATAGTGGGGTATCTAATCCCAGTTTG")),
    ParameterSpec::new(
        "amplicon_read_count",
        T::Int,
        "Number of reads to be simulated per amplicon.",
    )
    .with_default(D::Int(500)),
    ParameterSpec::new("amplicon_read_length", T::Int, "Length of reads to be simulated.")
        .with_default(D::Int(130)),
    ParameterSpec::new(
        "amplicon_seq_system",
        T::Str,
        "Sequencing system of reads to be simulated.",
    )
    .with_default(D::Str("HS25")),
    ParameterSpec::new(
        "amplicon_crabs_ispcr_error",
        T::Float,
        "Maximum number of errors allowed in CRABS insilicoPCR primer sequences",
    )
    .with_default(D::Float(4.5)),
    // Target capture options
    ParameterSpec::new(
        "probe_file",
        T::File,
        "Path to bait/probe file. Can be a fasta file or a bed file.",
    )
    .in_section("Target capture options"),
    ParameterSpec::new(
        "probe_ref_name",
        T::Str,
        "Name of supported probe. Mandatory if not using `--probes` parameter.",
    )
    .with_default(D::Str("Tetrapods-UCE-5Kv1")),
    ParameterSpec::new("target_capture_mode", T::Str, "Simulate 'illumina' or 'pacbio' reads.")
        .with_default(D::Str("illumina")),
    ParameterSpec::new("target_capture_fmedian", T::Int, "Median of fragment size at shearing.")
        .with_default(D::Int(500)),
    ParameterSpec::new(
        "target_capture_fshape",
        T::Float,
        "Shape parameter of the fragment size distribution.",
    )
    .with_default(D::Float(6.0)),
    ParameterSpec::new("target_capture_smedian", T::Int, "Median of fragment size distribution.")
        .with_default(D::Int(1300)),
    ParameterSpec::new(
        "target_capture_sshape",
        T::Float,
        "Shape parameter of the fragment size distribution.",
    )
    .with_default(D::Float(6.0)),
    ParameterSpec::new(
        "target_capture_tmedian",
        T::Int,
        "Median of target fragment size (the fragment size of the data). If specified, will override '--fmedian' and '--smedian'. Othersise will be estimated.",
    ),
    ParameterSpec::new(
        "target_capture_tshape",
        T::Float,
        "Shape parameter of the effective fragment size distribution.",
    ),
    ParameterSpec::new("target_capture_num", T::Int, "Number of fragments.")
        .with_default(D::Int(500_000)),
    ParameterSpec::new("target_capture_illen", T::Int, "Illumina: read length.")
        .with_default(D::Int(150)),
    ParameterSpec::new(
        "target_capture_pblen",
        T::Int,
        "PacBio: Average (polymerase) read length.",
    )
    .with_default(D::Int(30_000)),
    ParameterSpec::new("target_capture_ilmode", T::Str, "Illumina: Sequencing mode.")
        .with_default(D::Str("pe")),
    // Metagenome options
    ParameterSpec::new("metagenome_abundance", T::Str, "Abundance distribution.")
        .with_default(D::Str("lognormal"))
        .in_section("Metagenome options"),
    ParameterSpec::new(
        "metagenome_abundance_file",
        T::File,
        "Path to tab-separated file containing abundance distribution.",
    ),
    ParameterSpec::new("metagenome_coverage", T::Str, "Coverage distribution."),
    ParameterSpec::new(
        "metagenome_coverage_file",
        T::File,
        "Path to tab-separated file containing coverage information.",
    ),
    ParameterSpec::new(
        "metagenome_input_format",
        T::Str,
        "Format of FASTA file used to generate reads",
    )
    .with_default(D::Str("genomes")),
    ParameterSpec::new("metagenome_n_reads", T::Str, "Number of reads to generate.")
        .with_default(D::Str("1M")),
    ParameterSpec::new("metagenome_mode", T::Str, "Can be 'kde', or 'basic'.")
        .with_default(D::Str("kde")),
    ParameterSpec::new("metagenome_model", T::Str, "Can be 'HiSeq', 'NovaSeq', or 'MiSeq'.")
        .with_default(D::Str("MiSeq")),
    ParameterSpec::new(
        "metagenome_gc_bias",
        T::Bool,
        "Use this option to prevent simulating reads that have abnormal GC content.",
    ),
    // Wholegenome options
    ParameterSpec::new("wholegenome_error_rate", T::Float, "The base error rate.")
        .with_default(D::Float(0.02))
        .in_section("Wholegenome options"),
    ParameterSpec::new(
        "wholegenome_outer_dist",
        T::Int,
        "The outer distance between the two ends.",
    )
    .with_default(D::Int(500)),
    ParameterSpec::new("wholegenome_standard_dev", T::Int, "The standard deviation.")
        .with_default(D::Int(50)),
    ParameterSpec::new("wholegenome_n_reads", T::Int, "The number of read pairs.")
        .with_default(D::Int(1_000_000)),
    ParameterSpec::new("wholegenome_r1_length", T::Int, "The length of the first reads.")
        .with_default(D::Int(70)),
    ParameterSpec::new("wholegenome_r2_length", T::Int, "The length of the second reads.")
        .with_default(D::Int(70)),
    ParameterSpec::new("wholegenome_mutation_rate", T::Float, "The rate of mutations.")
        .with_default(D::Float(0.001)),
    ParameterSpec::new("wholegenome_indel_fraction", T::Float, "The fraction of indels.")
        .with_default(D::Float(0.15)),
    ParameterSpec::new(
        "wholegenome_indel_extended",
        T::Float,
        "The probability that an indel is extended.",
    )
    .with_default(D::Float(0.3)),
    // Reference genome options
    ParameterSpec::new("genome", T::Str, "Name of iGenomes reference.")
        .in_section("Reference genome options"),
    ParameterSpec::new("fasta", T::File, "Path to reference FASTA file."),
    ParameterSpec::new(
        "ncbidownload_accessions",
        T::File,
        "Path to text file containing accession ids (one accession per row).",
    ),
    ParameterSpec::new(
        "ncbidownload_taxids",
        T::File,
        "Path to text file containing taxids (one taxid per row).",
    ),
    ParameterSpec::new(
        "ncbidownload_group",
        T::Str,
        "The NCBI taxonomic groups to download. Options include 'all', 'archaea', 'bacteria', 'fungi', 'invertebrate', 'metagenomes', 'plant', 'protozoa', 'vertebrate_mammalian', 'vertebrate_other', and 'viral'. A comma-separated list is also valid (e.g., 'bacteria,viral').",
    )
    .with_default(D::Str("all")),
    ParameterSpec::new(
        "ncbidownload_section",
        T::Str,
        "The NCBI section to download. 'refseq' or 'genbank'.",
    )
    .with_default(D::Str("refseq")),
    // Generic options
    ParameterSpec::new(
        "multiqc_methods_description",
        T::Str,
        "Custom MultiQC yaml file containing HTML including a methods description.",
    )
    .in_section("Generic options"),
];

/// All pipeline parameters in declaration order.
pub fn parameters() -> &'static [ParameterSpec] {
    PARAMETERS
}

/// Looks up a parameter by name.
pub fn lookup(name: &str) -> Option<&'static ParameterSpec> {
    PARAMETERS.iter().find(|spec| spec.name == name)
}

/// A titled group of parameters, as shown in the rendered form.
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub title: &'static str,
    pub parameters: Vec<&'static ParameterSpec>,
}

/// Groups the registry by section title.
///
/// A parameter without its own title belongs to the closest titled
/// parameter declared before it.
pub fn sections() -> Vec<Section> {
    let mut out: Vec<Section> = Vec::new();
    for spec in PARAMETERS {
        match (spec.section, out.last_mut()) {
            (Some(title), _) => out.push(Section {
                title,
                parameters: vec![spec],
            }),
            (None, Some(current)) => current.parameters.push(spec),
            (None, None) => out.push(Section {
                title: "Parameters",
                parameters: vec![spec],
            }),
        }
    }
    out
}
