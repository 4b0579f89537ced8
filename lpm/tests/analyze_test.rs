use std::fs;

use ociclient::{ImageManifest, OciDigest};

use lpm::{LpmError, Ownership};
use lpm::annotations::{
    ANNOTATION_SUBJECT_DIGEST, ANNOTATION_SUBJECT_DOCKERFILE_COMMAND, ANNOTATION_SUBJECT_SIZE,
    MEDIA_TYPE_LPM_MANIFEST,
};
use lpm::dockerfile;

const DOCKERFILE: &str = r#"
FROM mcr.microsoft.com/cbl-mariner/base/core:2.0

# install the runtime
RUN tdnf install -y python3 \
    && tdnf clean all

COPY app.py /app/app.py
"#;

const SUBJECT_MANIFEST: &str = r#"{
    "schemaVersion": 2,
    "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
    "config": {
        "mediaType": "application/vnd.docker.container.image.v1+json",
        "size": 1532,
        "digest": "sha256:8d1c4ff1e1bd3c1b5a8e3f4c5e1b4a1a1b2c3d4e5f60718293a4b5c6d7e8f901"
    },
    "layers": [
        {
            "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip",
            "size": 31411406,
            "digest": "sha256:1111111111111111111111111111111111111111111111111111111111111111"
        },
        {
            "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip",
            "size": 4096,
            "digest": "sha256:2222222222222222222222222222222222222222222222222222222222222222"
        },
        {
            "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip",
            "size": 18750211,
            "digest": "sha256:3333333333333333333333333333333333333333333333333333333333333333"
        },
        {
            "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip",
            "size": 312,
            "digest": "sha256:4444444444444444444444444444444444444444444444444444444444444444"
        }
    ]
}"#;

fn inputs() -> (Vec<lpm::Instruction>, ImageManifest) {
    let instructions = dockerfile::parse_str(DOCKERFILE).unwrap();
    let subject = ImageManifest::from_slice(SUBJECT_MANIFEST.as_bytes()).unwrap();
    (instructions, subject)
}

#[test]
fn test_analyze_dockerfile_and_manifest() {
    let (instructions, subject) = inputs();
    let reference = lpm::analyze(&instructions, &subject);
    let manifest = reference.manifest();

    assert_eq!(manifest.media_type, MEDIA_TYPE_LPM_MANIFEST);
    assert_eq!(manifest.layers.len(), 4);

    let ownership: Vec<_> = manifest
        .layers
        .iter()
        .map(|l| Ownership::of(&l.annotations))
        .collect();
    assert_eq!(
        ownership,
        vec![
            Some(Ownership::Upstream),
            Some(Ownership::Upstream),
            Some(Ownership::NonUpstream),
            Some(Ownership::NonUpstream),
        ]
    );

    assert_eq!(
        manifest.layers[0].annotations[ANNOTATION_SUBJECT_DOCKERFILE_COMMAND],
        "FROM mcr.microsoft.com/cbl-mariner/base/core:2.0"
    );
    assert_eq!(
        manifest.layers[2].annotations[ANNOTATION_SUBJECT_DOCKERFILE_COMMAND],
        "RUN tdnf install -y python3     && tdnf clean all"
    );
    assert_eq!(
        manifest.layers[3].annotations[ANNOTATION_SUBJECT_DOCKERFILE_COMMAND],
        "COPY app.py /app/app.py"
    );
    assert_eq!(
        manifest.layers[1].annotations[ANNOTATION_SUBJECT_DIGEST],
        "sha256:2222222222222222222222222222222222222222222222222222222222222222"
    );
    assert_eq!(manifest.layers[0].annotations[ANNOTATION_SUBJECT_SIZE], "31411406");
    assert_eq!(manifest.config.annotations[ANNOTATION_SUBJECT_SIZE], "1532");
}

#[test]
fn test_reference_descriptors_are_empty_placeholders() {
    let (instructions, subject) = inputs();
    let reference = lpm::analyze(&instructions, &subject);
    for blob in reference.manifest().blobs() {
        assert_eq!(blob.digest, OciDigest::empty());
        assert_eq!(blob.size, 0);
    }
}

#[test]
fn test_output_is_byte_identical_across_runs() {
    let (instructions, subject) = inputs();
    let first = lpm::analyze(&instructions, &subject).to_canonical_bytes().unwrap();
    let second = lpm::analyze(&instructions, &subject).to_canonical_bytes().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_output_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let dockerfile_path = dir.path().join("Dockerfile");
    let manifest_path = dir.path().join("manifest.json");
    let output_path = dir.path().join("lpm.json");
    fs::write(&dockerfile_path, DOCKERFILE).unwrap();
    fs::write(&manifest_path, SUBJECT_MANIFEST).unwrap();

    let instructions = dockerfile::parse_file(&dockerfile_path).unwrap();
    let subject = ImageManifest::from_slice(&fs::read(&manifest_path).unwrap()).unwrap();
    let reference = lpm::analyze(&instructions, &subject);
    fs::write(&output_path, reference.to_canonical_bytes().unwrap()).unwrap();

    let written = fs::read(&output_path).unwrap();
    assert_eq!(
        OciDigest::from_bytes(&written),
        reference.descriptor().unwrap().digest
    );
    let parsed = ImageManifest::from_slice(&written).unwrap();
    assert_eq!(&parsed, reference.manifest());
}

#[test]
fn test_malformed_manifest_is_rejected() {
    let broken = SUBJECT_MANIFEST.replace("\"layers\"", "\"layerz\"");
    assert!(ImageManifest::from_slice(broken.as_bytes()).is_err());
}

#[test]
fn test_analyze_files() {
    let dir = tempfile::tempdir().unwrap();
    let dockerfile_path = dir.path().join("Dockerfile");
    let manifest_path = dir.path().join("manifest.json");
    fs::write(&dockerfile_path, format!("\u{feff}{}", DOCKERFILE)).unwrap();
    fs::write(&manifest_path, SUBJECT_MANIFEST).unwrap();

    let (instructions, subject) = inputs();
    let expected = lpm::analyze(&instructions, &subject);
    let reference = lpm::analyze_files(&dockerfile_path, &manifest_path).unwrap();
    assert_eq!(
        reference.to_canonical_bytes().unwrap(),
        expected.to_canonical_bytes().unwrap()
    );

    let missing = dir.path().join("missing.json");
    assert!(matches!(
        lpm::analyze_files(&dockerfile_path, &missing),
        Err(LpmError::Read { .. })
    ));

    fs::write(&manifest_path, SUBJECT_MANIFEST.replace("\"layers\"", "\"layerz\"")).unwrap();
    assert!(matches!(
        lpm::analyze_files(&dockerfile_path, &manifest_path),
        Err(LpmError::SubjectManifest { .. })
    ));
}
