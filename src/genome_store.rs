use crate::error::CircosError;
use crate::track::{FeatureRecord, Strand};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

/// One contiguous replicon/chromosome of a genome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessionRecord {
    pub accession: String,
    pub length: u64,
    pub sequence: String,
}

/// Data-access collaborator supplying feature and sequence records.
/// Implementations must return accessions in a stable order; that order
/// defines the karyotype and the grouping of derived statistic windows.
pub trait GenomeStore {
    fn features(
        &self,
        genome_id: &str,
        feature_type: &str,
        strand: Option<Strand>,
        keywords: Option<&str>,
    ) -> Result<Vec<FeatureRecord>, CircosError>;

    fn accessions(&self, genome_id: &str) -> Result<Vec<AccessionRecord>, CircosError>;

    fn genome_name(&self, genome_id: &str) -> Result<String, CircosError>;
}

/// Catalog entry describing one genome: its display name, replicons and
/// annotated features.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenomeCatalogEntry {
    pub name: String,
    pub accessions: Vec<CatalogAccession>,
    pub features: Vec<CatalogFeature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogAccession {
    pub accession: String,
    pub sequence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFeature {
    pub accession: String,
    pub start: u64,
    pub end: u64,
    pub id: u64,
    pub feature_type: String,
    pub strand: String,
    #[serde(default)]
    pub product: Option<String>,
}

/// File-backed genome store loading one JSON catalog, keyed by genome id.
#[derive(Debug, Clone, Default)]
pub struct GenomeCatalog {
    genomes: HashMap<String, GenomeCatalogEntry>,
}

impl GenomeCatalog {
    pub fn from_json_file(path: &str) -> Result<Self, CircosError> {
        let text = fs::read_to_string(path)
            .map_err(|e| CircosError::io(format!("Could not read genome catalog '{path}': {e}")))?;
        let genomes: HashMap<String, GenomeCatalogEntry> = serde_json::from_str(&text)
            .map_err(|e| {
                CircosError::invalid_input(format!("Could not parse genome catalog '{path}': {e}"))
            })?;
        Ok(Self { genomes })
    }

    pub fn from_entries(genomes: HashMap<String, GenomeCatalogEntry>) -> Self {
        Self { genomes }
    }

    pub fn list_genomes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.genomes.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    fn entry(&self, genome_id: &str) -> Result<&GenomeCatalogEntry, CircosError> {
        self.genomes.get(genome_id).ok_or_else(|| {
            CircosError::data_unavailable(format!("Unknown genome '{genome_id}'"))
        })
    }
}

impl GenomeStore for GenomeCatalog {
    fn features(
        &self,
        genome_id: &str,
        feature_type: &str,
        strand: Option<Strand>,
        keywords: Option<&str>,
    ) -> Result<Vec<FeatureRecord>, CircosError> {
        let entry = self.entry(genome_id)?;
        Ok(entry
            .features
            .iter()
            .filter(|f| matches_feature_class(feature_type, &f.feature_type))
            .filter(|f| strand.is_none_or(|s| f.strand == s.symbol()))
            .filter(|f| {
                keywords.is_none_or(|kw| {
                    f.product
                        .as_deref()
                        .unwrap_or("")
                        .to_ascii_lowercase()
                        .contains(&kw.to_ascii_lowercase())
                })
            })
            .map(|f| FeatureRecord {
                accession: f.accession.clone(),
                start: f.start,
                end: f.end,
                id: f.id,
            })
            .collect())
    }

    fn accessions(&self, genome_id: &str) -> Result<Vec<AccessionRecord>, CircosError> {
        let entry = self.entry(genome_id)?;
        Ok(entry
            .accessions
            .iter()
            .map(|a| AccessionRecord {
                accession: a.accession.clone(),
                length: a.sequence.len() as u64,
                sequence: a.sequence.clone(),
            })
            .collect())
    }

    fn genome_name(&self, genome_id: &str) -> Result<String, CircosError> {
        Ok(self.entry(genome_id)?.name.clone())
    }
}

/// Maps a requested feature class onto stored feature types. The three
/// builtin classes partition the annotation: `cds` is exactly CDS, `rna` is
/// anything containing RNA, `misc` is everything else. Any other requested
/// class matches its own type name, case-insensitively.
fn matches_feature_class(requested: &str, feature_type: &str) -> bool {
    let stored = feature_type.to_ascii_uppercase();
    match requested.to_ascii_lowercase().as_str() {
        "cds" => stored == "CDS",
        "rna" => stored.contains("RNA"),
        "misc" => stored != "CDS" && !stored.contains("RNA"),
        other => stored == other.to_ascii_uppercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(accession: &str, id: u64, feature_type: &str, strand: &str, product: &str) -> CatalogFeature {
        CatalogFeature {
            accession: accession.to_string(),
            start: id * 100,
            end: id * 100 + 50,
            id,
            feature_type: feature_type.to_string(),
            strand: strand.to_string(),
            product: Some(product.to_string()),
        }
    }

    fn test_catalog() -> GenomeCatalog {
        let entry = GenomeCatalogEntry {
            name: "Mycobacterium tuberculosis H37Rv".to_string(),
            accessions: vec![CatalogAccession {
                accession: "NC_000962".to_string(),
                sequence: "ACGT".repeat(10),
            }],
            features: vec![
                feature("NC_000962", 1, "CDS", "+", "replication initiator DnaA"),
                feature("NC_000962", 2, "CDS", "-", "DNA gyrase subunit B"),
                feature("NC_000962", 3, "tRNA", "+", "tRNA-Ala"),
                feature("NC_000962", 4, "misc_feature", "+", "repeat region"),
            ],
        };
        GenomeCatalog::from_entries(HashMap::from([("83332.12".to_string(), entry)]))
    }

    #[test]
    fn test_builtin_classes_partition_features() {
        let store = test_catalog();
        let cds = store
            .features("83332.12", "cds", Some(Strand::Forward), None)
            .unwrap();
        assert_eq!(cds.iter().map(|f| f.id).collect::<Vec<_>>(), vec![1]);

        let rna = store.features("83332.12", "rna", None, None).unwrap();
        assert_eq!(rna.iter().map(|f| f.id).collect::<Vec<_>>(), vec![3]);

        let misc = store.features("83332.12", "misc", None, None).unwrap();
        assert_eq!(misc.iter().map(|f| f.id).collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn test_keyword_filter_is_case_insensitive_substring() {
        let store = test_catalog();
        let hits = store
            .features("83332.12", "cds", None, Some("gyrase"))
            .unwrap();
        assert_eq!(hits.iter().map(|f| f.id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_accession_length_matches_sequence() {
        let store = test_catalog();
        let accessions = store.accessions("83332.12").unwrap();
        assert_eq!(accessions.len(), 1);
        assert_eq!(accessions[0].length, 40);
    }

    #[test]
    fn test_unknown_genome_is_data_unavailable() {
        let store = test_catalog();
        let err = store.accessions("562.1").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::DataUnavailable);
    }
}
