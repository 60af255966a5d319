mod common;

use common::{collecting, collecting_options, fixture, init_tracing};
use neuromorph::diagnostics::WarningKind;
use neuromorph::error::WriteError;
use neuromorph::model::{
    Modifiers, MutableMorphology, PointLevel, PostSynapticDensity, MitoPointLevel, SectionTree, SectionType,
    SomaConvention, SomaType,
};
use neuromorph::parser::ParsingErrorType;
use neuromorph::{LoadOptions, MorphError, columnar, sanitize, swc};

fn perimeter_cell() -> MutableMorphology {
    let mut morph = MutableMorphology::new();
    morph.set_soma_point_level(
        PointLevel::with_diameters(vec![[1., 0., 0.], [0., 1., 0.], [-1., 0., 0.], [0., -1., 0.]], vec![0.; 4])
            .unwrap(),
    );
    morph.set_soma_convention(SomaConvention::Contour);
    let root = morph.append_root_section(
        PointLevel::new(vec![[0., 1., 0.], [0., 4., 0.]], vec![2., 2.], vec![6., 6.5]).unwrap(),
        SectionType::BasalDendrite,
    );
    for x in [-2., 2.] {
        let level = PointLevel::new(vec![[0., 4., 0.], [x, 6., 0.]], vec![1., 1.], vec![3., 3.5]).unwrap();
        morph.append_section(root, level, SectionType::BasalDendrite).unwrap();
    }
    morph
}

#[test]
fn test_swc_through_columnar_file() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cell.h5");
    let morph = swc::parse_file(fixture("simple.swc"), &collecting_options()).unwrap();

    let mut diagnostics = collecting();
    neuromorph::write_file_with(&morph, &path, &mut diagnostics).unwrap();
    assert_eq!(diagnostics.count(WarningKind::SomaNonContour), 1);

    let reread = neuromorph::load_mutable_file(&path, &collecting_options()).unwrap();
    assert_eq!(reread.soma().convention(), SomaConvention::Contour);
    assert_eq!(reread.soma().soma_type(), SomaType::SinglePoint);
    assert!(sanitize::diff_mutable(&morph, &reread).is_none());

    let original = swc::to_swc_string(&morph, &mut collecting()).unwrap();
    let converted = swc::to_swc_string(&reread, &mut collecting()).unwrap();
    assert_eq!(original, converted);
}

#[test]
fn test_asc_through_columnar_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cell.H5");
    let morph = neuromorph::load_mutable_file(fixture("simple.asc"), &collecting_options()).unwrap();

    let mut diagnostics = collecting();
    columnar::write_file_with(&morph, &path, &mut diagnostics).unwrap();
    assert!(diagnostics.warnings().is_empty(), "{:?}", diagnostics.warnings());

    let frozen = neuromorph::load_file(&path, &collecting_options()).unwrap();
    assert_eq!(frozen.soma().soma_type(), SomaType::SimpleContour);
    assert_eq!(frozen.section_count(), 4);
    assert!(sanitize::diff(&morph.to_immutable(), &frozen).is_none());
}

#[test]
fn test_perimeters_survive_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("perimeters.h5");
    let morph = perimeter_cell();
    columnar::write_file_with(&morph, &path, &mut collecting()).unwrap();

    let reread = columnar::parse_file(&path, &collecting_options()).unwrap();
    assert!(reread.soma().perimeters().is_empty());
    assert_eq!(reread.section(0).unwrap().perimeters(), &[6., 6.5]);
    assert_eq!(reread.section(2).unwrap().perimeters(), &[3., 3.5]);
    assert!(reread == morph);

    let err = swc::to_swc_string(&reread, &mut collecting()).unwrap_err();
    assert!(err.to_string().contains("perimeter data to SWC format"));
}

#[test]
fn test_organelles_survive_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("organelles.h5");
    let mut morph = perimeter_cell();
    let points = MitoPointLevel::new(vec![0, 0, 1], vec![0.1, 0.6, 0.3], vec![0.2, 0.2, 0.1]).unwrap();
    let mito = morph.append_mitochondrion(None, points).unwrap();
    let points = MitoPointLevel::new(vec![2], vec![0.5], vec![0.1]).unwrap();
    morph.append_mitochondrion(Some(mito), points).unwrap();
    morph.endoplasmic_reticulum_mut().push(0, 2.5, 8.0, 4);
    morph.endoplasmic_reticulum_mut().push(1, 1.5, 4.0, 2);
    morph.add_post_synaptic_density(PostSynapticDensity { section_id: 2, segment_id: 0, offset: 0.75 });
    columnar::write_file_with(&morph, &path, &mut collecting()).unwrap();

    let frozen = neuromorph::load_file(&path, &collecting_options()).unwrap();
    let mitochondria = frozen.mitochondria();
    assert_eq!(mitochondria.len(), 2);
    assert_eq!(mitochondria.section(0).unwrap().neurite_section_ids(), &[0, 0, 1]);
    assert_eq!(mitochondria.section(1).unwrap().parent(), Some(0));
    assert_eq!(mitochondria.depth_first().collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(frozen.endoplasmic_reticulum(), morph.endoplasmic_reticulum());
    assert_eq!(frozen.post_synaptic_density(), morph.post_synaptic_density());

    let err = neuromorph::asc::to_asc_string(&frozen.to_mutable(), &mut collecting()).unwrap_err();
    assert!(err.to_string().contains("mitochondria"));
}

#[test]
fn test_modifiers_apply_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cell.h5");
    let morph = swc::parse_file(fixture("simple.swc"), &collecting_options()).unwrap();
    columnar::write_file_with(&morph, &path, &mut collecting()).unwrap();

    let options = collecting_options().with_modifiers(Modifiers::NO_DUPLICATES | Modifiers::TWO_POINTS_SECTIONS);
    let reread = columnar::parse_file(&path, &options).unwrap();
    assert_eq!(reread.section(0).unwrap().points(), &[[0., 0., 0.], [0., 6., 0.]]);
    assert_eq!(reread.section(1).unwrap().points(), &[[2., 8., 0.]]);
    assert_eq!(reread.section(2).unwrap().points(), &[[-2., 8., 0.]]);
}

#[test]
fn test_rejects_damaged_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cell.h5");
    columnar::write_file_with(&perimeter_cell(), &path, &mut collecting()).unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    bytes.truncate(bytes.len() - 3);
    std::fs::write(&path, &bytes).unwrap();
    let err = columnar::parse_file(&path, &LoadOptions::default()).unwrap_err();
    assert!(matches!(err.as_parsing().unwrap().kind(), ParsingErrorType::InvalidContainer(_)));

    std::fs::write(&path, b"1 1 0 0 0 1 -1\n").unwrap();
    let err = columnar::parse_file(&path, &LoadOptions::default()).unwrap_err();
    assert!(err.to_string().contains("Not a columnar morphology container"));
}

#[test]
fn test_empty_morphology_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.h5");
    let mut diagnostics = collecting();
    columnar::write_file_with(&MutableMorphology::new(), &path, &mut diagnostics).unwrap();
    assert!(!path.exists());
    assert_eq!(diagnostics.count(WarningKind::WriteEmptyMorphology), 1);
}

#[test]
fn test_writer_rejects_disconnected_section() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("disconnected.h5");
    let mut morph = perimeter_cell();
    let stray = PointLevel::new(vec![[9., 9., 9.], [3., 7., 0.]], vec![1., 1.], vec![3., 3.]).unwrap();
    let root = morph.root_sections()[0];
    let section = morph.append_section(root, stray, SectionType::BasalDendrite).unwrap();

    let err = columnar::write_file_with(&morph, &path, &mut collecting()).unwrap_err();
    assert!(matches!(err, MorphError::Write(WriteError::DisconnectedSection { section: s, parent })
        if s == section && parent == root));
    assert!(!path.exists());
}

#[test]
fn test_writer_rejects_mixed_perimeters() {
    let mut morph = perimeter_cell();
    let plain = PointLevel::with_diameters(vec![[0., 4., 0.], [0., 7., 0.]], vec![1., 1.]).unwrap();
    let section = morph.append_section(0, plain, SectionType::BasalDendrite).unwrap();

    let err = columnar::to_table_store(&morph, &mut collecting()).unwrap_err();
    assert!(matches!(err, MorphError::Write(WriteError::MixedPerimeterData { section: s }) if s == section));
}

#[test]
fn test_no_duplicates_morphology_is_not_writable() {
    let options = collecting_options().with_modifiers(Modifiers::NO_DUPLICATES);
    let morph = swc::parse_file(fixture("simple.swc"), &options).unwrap();
    let err = swc::to_swc_string(&morph, &mut collecting()).unwrap_err();
    assert!(matches!(err, MorphError::Write(WriteError::DisconnectedSection { parent: 0, .. })));
}
