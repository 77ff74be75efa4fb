use super::defaults::DefaultsConfig;
use super::file::{
    FileConfig, FileDopantsConfig, FileScreeningConfig, FileSublatticeConfig, FileSymmetryConfig,
};
use super::models::AppConfig;
use crate::cli::ScreenArgs;
use crate::error::{CliError, Result};
use dopescan::ScreeningProblem;
use dopescan::core::models::composition::RoundedComposition;
use dopescan::core::models::species::SpeciesCounts;
use dopescan::core::models::sublattice::Sublattice;
use dopescan::core::scoring::pair::PairInteractionModel;
use dopescan::core::symmetry::provider::{
    CrystalSymmetry, CyclicGroup, DihedralGroup, ExplicitPermutations, GeneratedGroup,
    SymmetryProvider, TrivialGroup,
};
use dopescan::engine::config::{ScreeningConfig, ScreeningConfigBuilder};
use std::str::FromStr;
use tracing::{info, warn};

pub fn build_config(args: &ScreenArgs, threads: Option<usize>) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = FileConfig::from_file(&args.config)?;
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let screening = merge_screening(
        args,
        threads,
        file_config.screening.take().unwrap_or_default(),
        &defaults,
    )?;

    let sublattice_file = file_config.sublattice.take().ok_or_else(|| {
        CliError::Config("`[sublattice]` section is required.".to_string())
    })?;
    let host = sublattice_file
        .host
        .clone()
        .ok_or_else(|| CliError::Config("`sublattice.host` is required.".to_string()))?;
    let (sublattice, observed_counts) = build_sublattice(&sublattice_file, &host)?;

    let (counts, composition) =
        resolve_counts(&sublattice, &host, observed_counts, file_config.dopants.take())?;

    let symmetry_file = file_config.symmetry.take().unwrap_or_else(|| {
        warn!("No `[symmetry]` section given; every labeling is treated as distinct.");
        FileSymmetryConfig::Trivial
    });
    let symmetry_kind = symmetry_kind(&symmetry_file);
    let provider = build_symmetry_provider(symmetry_file, &defaults);
    let problem = ScreeningProblem::from_provider(sublattice, counts, provider.as_ref())?;

    let model: PairInteractionModel = match file_config.scorer.take() {
        Some(scorer) => scorer.into(),
        None => {
            warn!("No `[scorer]` section given; every configuration scores 0.");
            PairInteractionModel::default()
        }
    };

    info!(
        sites = problem.sublattice.len(),
        group_order = problem.group.order(),
        symmetry = symmetry_kind,
        "Job configuration assembled."
    );

    Ok(AppConfig {
        output_dir: args.output.clone(),
        problem,
        model,
        screening,
        composition,
        symmetry_kind,
    })
}

fn merge_screening(
    args: &ScreenArgs,
    threads: Option<usize>,
    file: FileScreeningConfig,
    defaults: &DefaultsConfig,
) -> Result<ScreeningConfig> {
    let mut builder = ScreeningConfigBuilder::new()
        .topk(args.topk.or(file.topk).unwrap_or(defaults.topk))
        .max_enum(args.max_enum.or(file.max_enum).unwrap_or(defaults.max_enum))
        .max_unique(
            args.max_unique
                .or(file.max_unique)
                .unwrap_or(defaults.max_unique),
        )
        .batch_size(
            args.batch_size
                .or(file.batch_size)
                .unwrap_or(defaults.batch_size),
        );
    if let Some(workers) = threads.or(file.num_workers) {
        builder = builder.num_workers(workers);
    }
    builder.build().map_err(|e| CliError::Config(e.to_string()))
}

fn build_sublattice(
    file: &FileSublatticeConfig,
    host: &str,
) -> Result<(Sublattice, Option<SpeciesCounts>)> {
    if let Some(site_species) = &file.site_species {
        let (sublattice, counts) = Sublattice::infer(site_species, &file.exclude, host)?;
        info!(
            parent_sites = site_species.len(),
            sublattice_sites = sublattice.len(),
            "Inferred substitutable sublattice from site species."
        );
        return Ok((sublattice, Some(counts)));
    }
    let sublattice = match (&file.parent_indices, file.sites) {
        (Some(indices), Some(sites)) if indices.len() != sites => {
            return Err(CliError::Config(format!(
                "`sublattice.parent-indices` lists {} sites but `sublattice.sites` is {sites}.",
                indices.len()
            )));
        }
        (Some(indices), _) => Sublattice::new(indices.clone())?,
        (None, Some(sites)) => Sublattice::contiguous(sites)?,
        (None, None) => {
            return Err(CliError::Config(
                "`[sublattice]` needs one of `site-species`, `parent-indices` or `sites`."
                    .to_string(),
            ));
        }
    };
    Ok((sublattice, None))
}

fn resolve_counts(
    sublattice: &Sublattice,
    host: &str,
    observed: Option<SpeciesCounts>,
    dopants: Option<FileDopantsConfig>,
) -> Result<(SpeciesCounts, Option<RoundedComposition>)> {
    let n_sites = sublattice.len();
    let dopants = dopants.unwrap_or_default();
    match (dopants.percent, dopants.count) {
        (Some(_), Some(_)) => Err(CliError::Config(
            "`[dopants]` accepts either `percent` or `count`, not both.".to_string(),
        )),
        (Some(percent), None) => {
            let rounded = RoundedComposition::from_percentages(n_sites, &percent)?;
            for warning in &rounded.warnings {
                warn!("Composition rounding: {warning}");
            }
            Ok((rounded.to_species_counts(host), Some(rounded)))
        }
        (None, Some(count)) => {
            let dopant_atoms: usize = count.values().sum();
            let host_count = n_sites.checked_sub(dopant_atoms).ok_or_else(|| {
                CliError::Config(format!(
                    "{dopant_atoms} dopant atoms do not fit on {n_sites} sublattice sites."
                ))
            })?;
            Ok((SpeciesCounts::with_dopants(host, host_count, count), None))
        }
        (None, None) => Ok((
            observed.unwrap_or_else(|| {
                SpeciesCounts::with_dopants(host, n_sites, Vec::<(String, usize)>::new())
            }),
            None,
        )),
    }
}

fn symmetry_kind(file: &FileSymmetryConfig) -> &'static str {
    match file {
        FileSymmetryConfig::Trivial => "trivial",
        FileSymmetryConfig::Cyclic => "cyclic",
        FileSymmetryConfig::Dihedral => "dihedral",
        FileSymmetryConfig::Permutations { .. } => "permutations",
        FileSymmetryConfig::Generators { .. } => "generators",
        FileSymmetryConfig::Crystal { .. } => "crystal",
    }
}

fn build_symmetry_provider(
    file: FileSymmetryConfig,
    defaults: &DefaultsConfig,
) -> Box<dyn SymmetryProvider> {
    match file {
        FileSymmetryConfig::Trivial => Box::new(TrivialGroup),
        FileSymmetryConfig::Cyclic => Box::new(CyclicGroup),
        FileSymmetryConfig::Dihedral => Box::new(DihedralGroup),
        FileSymmetryConfig::Permutations { maps } => Box::new(ExplicitPermutations { maps }),
        FileSymmetryConfig::Generators {
            generators,
            max_order,
        } => Box::new(GeneratedGroup {
            generators,
            max_order: max_order.unwrap_or(defaults.max_group_order),
        }),
        FileSymmetryConfig::Crystal {
            coords,
            operations,
            symprec,
        } => Box::new(CrystalSymmetry {
            site_coords: coords.into_iter().map(Into::into).collect(),
            operations: operations.into_iter().map(Into::into).collect(),
            symprec: symprec.unwrap_or(defaults.symprec),
        }),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {kind} value for {key}: {value}")))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{kv_pair}'. Expected KEY=VALUE."
            )));
        };

        match key {
            "screening.topk" => {
                config.screening.get_or_insert_with(Default::default).topk =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "screening.max-enum" => {
                config
                    .screening
                    .get_or_insert_with(Default::default)
                    .max_enum = Some(parse_value(key, value_str, "integer")?);
            }
            "screening.max-unique" => {
                config
                    .screening
                    .get_or_insert_with(Default::default)
                    .max_unique = Some(parse_value(key, value_str, "integer")?);
            }
            "screening.batch-size" => {
                config
                    .screening
                    .get_or_insert_with(Default::default)
                    .batch_size = Some(parse_value(key, value_str, "integer")?);
            }
            "screening.num-workers" => {
                config
                    .screening
                    .get_or_insert_with(Default::default)
                    .num_workers = Some(parse_value(key, value_str, "integer")?);
            }
            "sublattice.host" => {
                config.sublattice.get_or_insert_with(Default::default).host =
                    Some(value_str.to_string());
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{key}'"
                )));
            }
        }
    }
    Ok(config)
}
