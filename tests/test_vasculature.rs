mod common;

use common::init_tracing;
use neuromorph::columnar::{Table, TableStore};
use neuromorph::model::VascularSectionType;
use neuromorph::parser::ParsingErrorType;
use neuromorph::vasculature;

/// An artery splitting into two capillaries that merge again into a vein.
fn loop_store() -> TableStore {
    let mut store = TableStore::new(neuromorph::columnar::CURRENT_VERSION);
    let points = [
        [0., 0., 0., 4.],
        [0., 10., 0., 4.],
        [0., 10., 0., 1.],
        [5., 15., 0., 1.],
        [0., 10., 0., 1.],
        [-5., 15., 0., 1.],
        [5., 15., 0., 3.],
        [0., 20., 0., 3.],
        [0., 30., 0., 3.],
    ];
    store.insert("points", Table::from_f64_rows(&points));
    store.insert("structure", Table::from_i32_rows(&[[0, 2], [2, 6], [4, 5], [6, 1]]));
    store.insert("connectivity", Table::from_i32_rows(&[[0, 1], [0, 2], [1, 3], [2, 3]]));
    store
}

#[test]
fn test_vessel_loop_from_file() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vessels.h5");
    std::fs::write(&path, loop_store().to_bytes().unwrap()).unwrap();

    let vessels = vasculature::parse_file(&path).unwrap();
    assert!(vessels.uri().ends_with("vessels.h5"));
    assert_eq!(vessels.section_count(), 4);
    assert_eq!(vessels.points().len(), 9);

    let types: Vec<_> = vessels.sections().map(|section| section.section_type()).collect();
    assert_eq!(
        types,
        vec![
            VascularSectionType::Artery,
            VascularSectionType::ArterialCapillary,
            VascularSectionType::VenousCapillary,
            VascularSectionType::Vein
        ]
    );

    let vein = vessels.section(3).unwrap();
    assert_eq!(vein.predecessors(), &[1, 2]);
    assert!(vein.successors().is_empty());
    assert_eq!(vein.diameters(), &[3., 3., 3.]);
    assert_eq!(vessels.section(0).unwrap().successors(), &[1, 2]);
    assert_eq!(vessels.section(0).unwrap().length(), 10.);
    assert_eq!(vessels.graph_iter().collect::<Vec<_>>(), vec![0, 1, 3, 2]);
}

#[test]
fn test_encoding_keeps_the_graph() {
    let vessels = vasculature::parse_bytes(&loop_store().to_bytes().unwrap()).unwrap();
    let again = vasculature::parse_bytes(&vasculature::to_table_store(&vessels).to_bytes().unwrap()).unwrap();
    assert_eq!(again, vessels);
}

#[test]
fn test_unknown_vessel_type() {
    let mut store = loop_store();
    store.insert("structure", Table::from_i32_rows(&[[0, 2], [2, 6], [4, 5], [6, 11]]));
    let err = vasculature::parse_bytes_with(&store.to_bytes().unwrap(), "vessels.h5").unwrap_err();
    let parsing = err.as_parsing().unwrap();
    assert_eq!(parsing.kind(), &ParsingErrorType::UnsupportedSectionType(11));
    assert!(err.to_string().starts_with("vessels.h5"), "{err}");
}
