use std::path::Path;

use anyhow::Context;
use kmertree_core::io::csv::{read_distance_matrix_csv, write_distance_matrix_csv};
use kmertree_core::io::fasta::read_fasta;
use kmertree_core::io::write_lines;
use kmertree_core::phylo::{random_distance_matrix, DistanceMatrix};
use kmertree_core::pipeline::{build_tree, paml_to_newick, sequence_distances};
use tracing::info;

use crate::cli::{FastaArgs, MatrixArgs, PamlArgs, RandomArgs, TreeArgs};

fn emit(tree: &TreeArgs, lines: &[String]) -> anyhow::Result<()> {
    match &tree.output {
        Some(path) => {
            write_lines(path, lines).with_context(|| format!("writing {}", path.display()))?;
            info!(trees = lines.len(), path = %path.display(), "newick written");
        }
        None => {
            for line in lines {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn save_matrix(dist: &DistanceMatrix, path: Option<&Path>) -> anyhow::Result<()> {
    if let Some(path) = path {
        write_distance_matrix_csv(path, dist)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "distance matrix written");
    }
    Ok(())
}

fn tree_from_matrix(dist: &DistanceMatrix, args: &TreeArgs) -> anyhow::Result<()> {
    let config = args.resolve()?;
    let build = build_tree(dist, &config)?;
    emit(args, &[build.newick])
}

pub fn fasta(args: FastaArgs) -> anyhow::Result<()> {
    let config = args.tree.resolve()?;
    let set = read_fasta(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    info!(sequences = set.len(), "sequences loaded");
    let dist = sequence_distances(&set, &config)?;
    save_matrix(&dist, args.matrix_out.as_deref())?;
    let build = build_tree(&dist, &config)?;
    emit(&args.tree, &[build.newick])
}

pub fn paml(args: PamlArgs) -> anyhow::Result<()> {
    let config = args.tree.resolve()?;
    let lines = paml_to_newick(&args.input, args.replicates, &config)
        .with_context(|| format!("processing {}", args.input.display()))?;
    emit(&args.tree, &lines)
}

pub fn matrix(args: MatrixArgs) -> anyhow::Result<()> {
    let dist = read_distance_matrix_csv(&args.input)?;
    tree_from_matrix(&dist, &args.tree)
}

pub fn random(args: RandomArgs) -> anyhow::Result<()> {
    let dist = random_distance_matrix(args.taxa, args.seed)?;
    save_matrix(&dist, args.matrix_out.as_deref())?;
    tree_from_matrix(&dist, &args.tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmertree_core::phylo::parse_newick;
    use std::fs;
    use std::path::PathBuf;

    const FASTA: &str = ">a\nACGTACGTAA\n>b\nACGTACGTAC\n>c\nTTGGCCAATT\n>d\nTTGGCCAATA\n";

    fn tree_args(output: PathBuf) -> TreeArgs {
        TreeArgs {
            output: Some(output),
            ..TreeArgs::default()
        }
    }

    #[test]
    fn fasta_writes_tree_and_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.fa");
        fs::write(&input, FASTA).unwrap();
        let out = dir.path().join("out.nwk");
        let csv = dir.path().join("dist.csv");

        fasta(FastaArgs {
            input,
            matrix_out: Some(csv.clone()),
            tree: tree_args(out.clone()),
        })
        .unwrap();

        let text = fs::read_to_string(&out).unwrap();
        assert_eq!(text.lines().count(), 1);
        let parsed = parse_newick(text.trim_end()).unwrap();
        assert_eq!(parsed.leaf_names().len(), 4);

        let dist = read_distance_matrix_csv(&csv).unwrap();
        assert_eq!(dist.n(), 4);
        assert_eq!(dist.labels()[3].as_ref(), "d");
    }

    #[test]
    fn random_matrix_round_trips_through_matrix_command() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("random.csv");
        let first = dir.path().join("first.nwk");
        let second = dir.path().join("second.nwk");

        random(RandomArgs {
            taxa: 6,
            seed: 3,
            matrix_out: Some(csv.clone()),
            tree: tree_args(first.clone()),
        })
        .unwrap();
        matrix(MatrixArgs {
            input: csv,
            tree: tree_args(second.clone()),
        })
        .unwrap();

        let a = parse_newick(fs::read_to_string(first).unwrap().trim_end()).unwrap();
        let b = parse_newick(fs::read_to_string(second).unwrap().trim_end()).unwrap();
        assert_eq!(a.leaf_names(), b.leaf_names());
        let (pa, pb) = (a.patristic_matrix(), b.patristic_matrix());
        for i in 0..6 {
            for j in 0..6 {
                assert!((pa[i][j] - pb[i][j]).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn paml_writes_one_line_per_replicate() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("reps.phy");
        fs::write(
            &input,
            "3 6\nx ACGTAC\ny ACGTAA\nz TTGTAA\n\n3 6\nx ACGTAC\ny TCGTAC\nz TTGTAA\n",
        )
        .unwrap();
        let out = dir.path().join("reps.nwk");
        paml(PamlArgs {
            input,
            replicates: 2,
            tree: tree_args(out.clone()),
        })
        .unwrap();
        assert_eq!(fs::read_to_string(out).unwrap().lines().count(), 2);
    }

    #[test]
    fn missing_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = matrix(MatrixArgs {
            input: dir.path().join("absent.csv"),
            tree: TreeArgs::default(),
        })
        .unwrap_err();
        assert!(err.downcast_ref::<kmertree_core::PhyloError>().is_some());
    }
}
