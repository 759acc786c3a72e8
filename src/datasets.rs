// src/datasets.rs

/// One entry of the built-in dataset catalog.
#[derive(Debug, Clone, Copy)]
pub struct Dataset {
    /// Dataset code as the dissemination API knows it.
    pub code: &'static str,
    pub description: &'static str,
}

static DATASETS: &[Dataset] = &[
    Dataset {
        code: "nama_10_gdp",
        description: "Gross domestic product (GDP) and main components (output, expenditure and income)",
    },
    Dataset {
        code: "demo_pjan",
        description: "Population on 1 January by age",
    },
    Dataset {
        code: "lfsa_urgan",
        description: "Unemployment rate by region, age group and education level",
    },
    Dataset {
        code: "prc_hicp_aind",
        description: "Harmonised index of consumer prices (HICP)",
    },
    Dataset {
        code: "env_air_gge",
        description: "Greenhouse gas emissions by source",
    },
    Dataset {
        code: "ilc_mddd11",
        description: "Material deprivation rate by age group",
    },
    Dataset {
        code: "nrg_ind_ren",
        description: "Renewable energy consumption by type of energy",
    },
    Dataset {
        code: "gov_10dd_edpt1",
        description: "Government debt by sector",
    },
    Dataset {
        code: "isoc_ci_ifp_iu",
        description: "Individuals using the Internet by age group",
    },
    Dataset {
        code: "migr_imm1ctz",
        description: "Immigration by age group and citizenship",
    },
];

/// A dataset selected for one sync run. Codes outside the catalog are still
/// syncable; they just carry no description.
#[derive(Debug, Clone)]
pub struct Target {
    pub code: String,
    pub description: Option<&'static str>,
}

pub fn all() -> &'static [Dataset] {
    DATASETS
}

pub fn find(code: &str) -> Option<&'static Dataset> {
    DATASETS.iter().find(|d| d.code == code)
}

/// Resolve configured codes against the catalog.
pub fn resolve(codes: &[String]) -> Vec<Target> {
    codes
        .iter()
        .map(|code| Target {
            code: code.clone(),
            description: find(code).map(|d| d.description),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_codes_are_unique() {
        let codes: HashSet<&str> = all().iter().map(|d| d.code).collect();
        assert_eq!(codes.len(), all().len());
    }

    #[test]
    fn find_hits_catalog_entries_only() {
        assert_eq!(find("demo_pjan").unwrap().description, "Population on 1 January by age");
        assert!(find("no_such_dataset").is_none());
    }

    #[test]
    fn resolve_keeps_order_and_marks_ad_hoc_codes() {
        let targets = resolve(&["tps00001".to_string(), "nama_10_gdp".to_string()]);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].code, "tps00001");
        assert!(targets[0].description.is_none());
        assert!(targets[1].description.is_some());
    }
}
