use clap::{Parser, ValueEnum};
use env_logger::Builder;
use log::{error, info, LevelFilter};
use rayon::prelude::*;
use rust_python_tree_clusters::cluster::clusters_with_costs;
use rust_python_tree_clusters::distances::{pairwise_matrix, DistanceCosts};
use rust_python_tree_clusters::io::{read_newick_trees, write_clusters_tsv, write_matrix_tsv};
use rust_python_tree_clusters::snapshot::TreeSnapshot;
use rust_python_tree_clusters::Error;
use std::path::PathBuf;
use std::time::Instant;

/// Group nodes of labelled Newick trees into structural clusters, or write
/// the pairwise structural distance matrix of the selected nodes.
#[derive(Parser, Debug)]
#[command(name = "tree-clusters", version, about = "Structural clustering of tree nodes")]
struct Args {
    /// Path to a Newick file, one `;`-terminated tree per record (.gz accepted)
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Output path for the TSV result (`-` for stdout, `.gz` to compress)
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Comma-separated node labels to cluster (default: all non-whitespace leaves)
    #[arg(long = "nodes", value_delimiter = ',')]
    nodes: Vec<String>,

    /// Exclusive merge threshold; `inf` merges everything
    #[arg(long = "too-far", default_value_t = 5.0)]
    too_far: f64,

    /// What to write: clusters | matrix
    #[arg(long = "mode", value_enum, default_value_t = ModeArg::Clusters)]
    mode: ModeArg,

    #[arg(long = "same-tag-cost", default_value_t = DistanceCosts::default().same_tag)]
    same_tag_cost: f64,

    #[arg(long = "different-tag-cost", default_value_t = DistanceCosts::default().different_tag)]
    different_tag_cost: f64,

    #[arg(long = "different-depth-cost", default_value_t = DistanceCosts::default().different_depth)]
    different_depth_cost: f64,

    #[arg(long = "stride-cost", default_value_t = DistanceCosts::default().stride)]
    stride_cost: f64,

    /// Quiet mode: only errors are logged
    #[arg(short = 'q', long = "quiet", default_value_t = false)]
    quiet: bool,

    /// Verbose mode: log every merge
    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModeArg { Clusters, Matrix }

impl Args {
    fn costs(&self) -> DistanceCosts {
        DistanceCosts::default()
            .with_same_tag(self.same_tag_cost)
            .with_different_tag(self.different_tag_cost)
            .with_different_depth(self.different_depth_cost)
            .with_stride(self.stride_cost)
    }

    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

fn main() {
    let args = Args::parse();
    Builder::new().filter(None, args.log_level()).init();

    // Read trees with names
    let t0 = Instant::now();
    let named_trees = match read_newick_trees(&args.input) {
        Ok(trees) => trees,
        Err(e) => {
            error!("Failed to read {:?}: {e}", args.input);
            std::process::exit(2);
        }
    };
    info!("Read {} trees in {:.3}s", named_trees.len(), t0.elapsed().as_secs_f64());

    let result = match args.mode {
        ModeArg::Clusters => run_clusters(&args, &named_trees),
        ModeArg::Matrix => run_matrix(&args, &named_trees),
    };
    if let Err(e) = result {
        error!("{e}");
        let code = match e {
            Error::Io(_) => 4,
            _ => 3,
        };
        std::process::exit(code);
    }
}

/// Nodes to work on in one tree: the requested labels, or every content leaf.
fn select_nodes(args: &Args, snap: &TreeSnapshot) -> Result<Vec<usize>, Error> {
    if args.nodes.is_empty() {
        Ok(snap.content_leaves())
    } else {
        snap.resolve(&args.nodes)
    }
}

fn labels_of(snap: &TreeSnapshot, nodes: &[usize]) -> Vec<String> {
    nodes
        .iter()
        .map(|&n| snap.label(n).map_or_else(|| format!("#{n}"), str::to_string))
        .collect()
}

fn run_clusters(args: &Args, named_trees: &[(String, TreeSnapshot)]) -> Result<(), Error> {
    let costs = args.costs();

    // Trees are independent: one clustering run per tree, in parallel
    let t1 = Instant::now();
    let results = named_trees
        .par_iter()
        .map(|(name, snap)| -> Result<(String, Vec<Vec<String>>), Error> {
            let nodes = select_nodes(args, snap)?;
            let groups = clusters_with_costs(snap, &nodes, args.too_far, &costs)?;
            info!("{name}: {} nodes -> {} clusters", nodes.len(), groups.len());
            let labelled = groups.iter().map(|g| labels_of(snap, g)).collect();
            Ok((name.clone(), labelled))
        })
        .collect::<Result<Vec<_>, Error>>()?;
    info!("Clustering {:.3}s", t1.elapsed().as_secs_f64());

    let t2 = Instant::now();
    write_clusters_tsv(&args.output, &results)?;
    log_write_done(&args.output, t2.elapsed().as_secs_f64());
    Ok(())
}

fn run_matrix(args: &Args, named_trees: &[(String, TreeSnapshot)]) -> Result<(), Error> {
    let [(name, snap)] = named_trees else {
        return Err(Error::InvalidArgument(format!(
            "matrix mode needs exactly one tree, found {}",
            named_trees.len()
        )));
    };

    let nodes = select_nodes(args, snap)?;
    let n = nodes.len();
    info!("{name}: determining distances for {} combinations", n * n.saturating_sub(1) / 2);

    let t1 = Instant::now();
    let mat = pairwise_matrix(snap, &nodes, &args.costs())?;
    info!("Determining distances {:.3}s", t1.elapsed().as_secs_f64());

    let t2 = Instant::now();
    write_matrix_tsv(&args.output, &labels_of(snap, &nodes), &mat)?;
    log_write_done(&args.output, t2.elapsed().as_secs_f64());
    Ok(())
}

fn log_write_done(output: &PathBuf, secs: f64) {
    let is_stdout = output.as_os_str() == "-";
    if is_stdout {
        info!("Writing to stdout {secs:.3}s");
    } else {
        info!("Writing to output {secs:.3}s");
    }
}
