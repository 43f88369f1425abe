//! Plan files: a pretty-printed JSON array with one array of URLs per
//! bucket, indented by four spaces.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::error::{Error, Result};
use crate::plan::RequestPlan;

pub fn save(plan: &RequestPlan, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    plan.serialize(&mut ser).map_err(|source| Error::Encode {
        path: path.to_path_buf(),
        source,
    })?;

    fs::write(path, buf).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(
        "Saved {} buckets ({} requests) to {}",
        plan.buckets.len(),
        plan.total_targets(),
        path.display()
    );
    Ok(())
}

pub fn load(path: impl AsRef<Path>) -> Result<RequestPlan> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let plan: RequestPlan = serde_json::from_str(&data).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(
        "Loaded {} buckets ({} requests) from {}",
        plan.buckets.len(),
        plan.total_targets(),
        path.display()
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateSpec;
    use crate::plan::{Bucket, PlanBuilder};

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        let spec = RateSpec::builder()
            .base_url("http://localhost:3000/items")
            .mean_requests(60)
            .duration_secs(6)
            .build();
        let plan = PlanBuilder::seeded(spec, 8).unwrap().build().unwrap();

        save(&plan, &path).unwrap();
        assert_eq!(load(&path).unwrap(), plan);
    }

    #[test]
    fn writes_indented_nested_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        let plan: RequestPlan = vec![Bucket::new(vec!["http://a/7".into()]), Bucket::default()]
            .into_iter()
            .collect();

        save(&plan, &path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "[\n    [\n        \"http://a/7\"\n    ],\n    []\n]");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load(dir.path().join("nope.json")),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn wrong_shape_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        fs::write(&path, r#"{"buckets": [1, 2]}"#).unwrap();
        assert!(matches!(load(&path), Err(Error::Parse { .. })));

        fs::write(&path, "[[1, 2]]").unwrap();
        assert!(matches!(load(&path), Err(Error::Parse { .. })));
    }

    #[test]
    fn encode_error_names_the_save_side() {
        let source = serde_json::from_str::<u8>("x").unwrap_err();
        let err = Error::Encode {
            path: "plan.json".into(),
            source,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("failed to encode plan for plan.json"), "{msg}");
    }

    #[test]
    fn unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("plan.json");
        assert!(matches!(
            save(&RequestPlan::default(), path),
            Err(Error::Io { .. })
        ));
    }
}
