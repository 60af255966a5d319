mod common;

use common::{collecting, collecting_options, fixture, init_tracing};
use neuromorph::diagnostics::{Diagnostics, WarningKind, WarningPolicy};
use neuromorph::error::WriteError;
use neuromorph::model::{MutableMorphology, PointLevel, SectionTree, SectionType, SomaType};
use neuromorph::parser::ParsingErrorType;
use neuromorph::{LoadOptions, MorphError, WriteOptions, swc};

fn parse_collecting(content: &str) -> (Result<MutableMorphology, MorphError>, Diagnostics) {
    let mut diagnostics = collecting();
    let result = swc::parse_str_with(content, "cell.swc", &collecting_options(), &mut diagnostics);
    (result, diagnostics)
}

fn error_kind(content: &str) -> (ParsingErrorType, Option<usize>) {
    let (result, _) = parse_collecting(content);
    let err = result.unwrap_err();
    let parsing = err.as_parsing().expect("parsing error");
    (parsing.kind().clone(), parsing.line())
}

// =#========================================================================#=
// READING
// =#========================================================================#=
#[test]
fn test_neurite_attached_to_single_point_soma() {
    init_tracing();
    let morph = swc::parse_str(
        "1 1 0 4 0 3.0 -1\n\
         2 3 0 0 2 0.5 1\n\
         3 3 0 0 3 0.5 2\n\
         4 3 0 0 4 0.5 3\n\
         5 3 0 0 5 0.5 4",
    )
    .unwrap();

    assert_eq!(morph.soma().points(), &[[0., 4., 0.]]);
    assert_eq!(morph.soma().diameters(), &[6.0]);
    assert_eq!(morph.root_sections().len(), 1);
    let root = morph.section(morph.root_sections()[0]).unwrap();
    assert_eq!(root.section_type(), SectionType::BasalDendrite);
    assert_eq!(root.points(), &[[0., 0., 2.], [0., 0., 3.], [0., 0., 4.], [0., 0., 5.]]);
    assert_eq!(root.diameters(), &[1.0; 4]);
}

#[test]
fn test_three_point_soma_without_warnings() {
    let mut diagnostics = collecting();
    let morph = swc::parse_file_with(fixture("three_point_soma.swc"), &collecting_options(), &mut diagnostics).unwrap();

    assert_eq!(morph.soma().soma_type(), SomaType::ThreePoint);
    assert_eq!(morph.soma().points().len(), 3);
    assert_eq!(morph.section_count(), 2);
    assert!(diagnostics.warnings().is_empty(), "{:?}", diagnostics.warnings());

    let types: Vec<SectionType> = morph.depth_first().map(|id| morph.section(id).unwrap().section_type()).collect();
    assert_eq!(types, vec![SectionType::Axon, SectionType::BasalDendrite]);
}

#[test]
fn test_bifurcation_prepends_parent_point() {
    let morph = swc::parse_file(fixture("simple.swc"), &collecting_options()).unwrap();

    assert_eq!(morph.section_count(), 3);
    assert_eq!(morph.section(0).unwrap().points(), &[[0., 0., 0.], [0., 4., 0.], [0., 6., 0.]]);
    assert_eq!(morph.section(1).unwrap().points(), &[[0., 6., 0.], [2., 8., 0.]]);
    assert_eq!(morph.section(2).unwrap().points(), &[[0., 6., 0.], [-2., 8., 0.]]);
    assert_eq!(morph.section(0).unwrap().children(), &[1, 2]);
    assert_eq!(morph.leaves(), vec![1, 2]);
}

#[test]
fn test_comments_blank_lines_and_extra_columns() {
    let (result, diagnostics) = parse_collecting(
        "# header\n\
         \n\
         1  1 0 0 0 1 -1   # soma\n\
         2\t3 0 0 0 1 1 extra columns\n\
         \n\
         3 3 0 5 0 1 2\n",
    );
    let morph = result.unwrap();
    assert_eq!(morph.section_count(), 1);
    assert_eq!(morph.section(0).unwrap().points().len(), 2);
    assert!(diagnostics.warnings().is_empty());
}

#[test]
fn test_reading_warnings() {
    let (result, diagnostics) = parse_collecting("1 1 0 0 0 1 -1\n2 3 0 0 1 0 1\n3 3 0 0 2 1 2\n");
    assert!(result.is_ok());
    assert_eq!(diagnostics.count(WarningKind::ZeroDiameter), 1);
    assert_eq!(diagnostics.warnings()[0].location().and_then(|l| l.line()), Some(2));

    let (result, diagnostics) = parse_collecting("1 3 0 0 0 1 -1\n2 3 0 0 1 1 1\n");
    assert_eq!(result.unwrap().section_count(), 1);
    assert_eq!(diagnostics.count(WarningKind::NoSomaFound), 1);

    let (result, diagnostics) = parse_collecting("1 1 0 0 0 1 -1\n2 3 0 0 1 1 -1\n3 3 0 0 2 1 2\n");
    assert_eq!(result.unwrap().section_count(), 1);
    assert_eq!(diagnostics.count(WarningKind::DisconnectedNeurite), 1);
}

#[test]
fn test_three_point_soma_layout_warnings() {
    let (result, diagnostics) = parse_collecting("1 1 0 0 0 3.0 -1\n2 1 0 -2 0 3.0 1\n3 1 0 3 0 3.0 1\n");
    assert_eq!(result.unwrap().soma().soma_type(), SomaType::Cylinders);
    assert_eq!(diagnostics.count(WarningKind::SomaNonConform), 1);

    let (result, diagnostics) = parse_collecting(
        "1 1 0 0 0 3.0 -1\n\
         2 1 0 -3 0 3.0 1\n\
         3 1 0 3 0 3.0 1\n\
         4 3 0 -3 1 1 2\n\
         5 3 0 -3 4 1 4\n",
    );
    assert_eq!(result.unwrap().section_count(), 1);
    assert_eq!(diagnostics.count(WarningKind::WrongRootPoint), 1);
}

#[test]
fn test_raising_policy_turns_warnings_into_errors() {
    let options = LoadOptions::default().with_policy(WarningPolicy::raising());
    let err = swc::parse_str_with("1 3 0 0 0 1 -1\n2 3 0 0 1 1 1\n", "cell.swc", &options, &mut options.diagnostics())
        .unwrap_err();
    assert!(matches!(err, MorphError::RaisedWarning(ref w) if w.kind() == WarningKind::NoSomaFound));

    let options = LoadOptions::default().with_policy(
        WarningPolicy::raising().ignoring(WarningKind::NoSomaFound),
    );
    assert!(swc::parse_str_with("1 3 0 0 0 1 -1\n2 3 0 0 1 1 1\n", "cell.swc", &options, &mut options.diagnostics()).is_ok());
}

#[test]
fn test_reading_errors_name_their_line() {
    let (kind, line) = error_kind("1 1 0 0 0 1 -1\n2 3 0 0 1 1 1\n2 3 0 0 2 1 1\n");
    assert!(matches!(kind, ParsingErrorType::RepeatedId { id: 2, ref first } if first.line() == Some(2)));
    assert_eq!(line, Some(3));

    assert_eq!(error_kind("1 1 0 0 0 1 -1\n-2 3 0 0 1 1 1\n"), (ParsingErrorType::NegativeId(-2), Some(2)));
    assert_eq!(error_kind("1 1 0 0 0 1 -1\n2 3 0 0 1 1 2\n"), (ParsingErrorType::SelfParent, Some(2)));
    assert_eq!(
        error_kind("1 1 0 0 0 1 -1\n2 3 0 0 1 1 7\n"),
        (ParsingErrorType::MissingParent { id: 2, parent: 7 }, Some(2))
    );
    assert_eq!(
        error_kind("1 1 0 0 0 1 -1\n2 3 0 0 1 1 -5\n"),
        (ParsingErrorType::MissingParent { id: 2, parent: -5 }, Some(2))
    );
    assert_eq!(error_kind("1 1 0 0 0 1 -1\n2 11 0 0 1 1 1\n"), (ParsingErrorType::UnsupportedSectionType(11), Some(2)));
    assert_eq!(error_kind("1 0 0 0 0 1 -1\n"), (ParsingErrorType::UnsupportedSectionType(0), Some(1)));
    assert_eq!(error_kind("1 1 0 0 0 1 -1\n2 3 0 0 x 1 1\n"), (ParsingErrorType::MalformedRecord, Some(2)));
    assert_eq!(error_kind("1 1 0 0 0 1\n"), (ParsingErrorType::MalformedRecord, Some(1)));
    assert_eq!(error_kind("1 3 0 0 0 1 2\n2 3 0 0 1 1 1\n"), (ParsingErrorType::CyclicParent { id: 1 }, Some(1)));

    let (kind, line) = error_kind("1 1 0 0 0 1 -1\n2 1 5 0 0 1 -1\n");
    assert!(matches!(kind, ParsingErrorType::MultipleSoma(ref locations) if locations.len() == 2));
    assert_eq!(line, Some(2));

    let (kind, _) = error_kind("1 3 0 0 0 1 -1\n2 1 0 0 1 1 1\n");
    assert!(matches!(kind, ParsingErrorType::SomaPlacement(ref msg) if msg.contains("neurite as parent")));

    let (kind, line) = error_kind("1 1 0 0 0 1 -1\n2 1 0 1 0 1 1\n3 1 0 2 0 1 2\n4 1 0 1 1 1 2\n");
    assert!(matches!(kind, ParsingErrorType::SomaPlacement(ref msg) if msg.contains("soma bifurcation")));
    assert_eq!(line, Some(2));
}

#[test]
fn test_type_change_without_bifurcation() {
    let content = "1 3 0 0 0 1 -1\n2 3 0 1 0 1 1\n3 2 0 2 0 1 2\n4 2 0 3 0 1 3\n";
    assert_eq!(error_kind(content), (ParsingErrorType::SectionTypeChanged, Some(3)));

    let options = collecting_options().with_allow_type_change();
    let mut diagnostics = collecting();
    let morph = swc::parse_str_with(content, "cell.swc", &options, &mut diagnostics).unwrap();
    assert_eq!(diagnostics.count(WarningKind::SectionTypeChanged), 1);
    assert_eq!(morph.section_count(), 2);
    let axon = morph.section(1).unwrap();
    assert_eq!(axon.section_type(), SectionType::Axon);
    assert_eq!(axon.parent(), Some(0));
    assert_eq!(axon.points(), &[[0., 1., 0.], [0., 2., 0.], [0., 3., 0.]]);
}

// =#========================================================================#=
// WRITING
// =#========================================================================#=
#[test]
fn test_writer_reproduces_samples() {
    let morph = swc::parse_file(fixture("simple.swc"), &collecting_options()).unwrap();
    let content = swc::to_swc_string(&morph, &mut collecting()).unwrap().unwrap();
    let mut lines = content.lines();
    assert!(lines.next().unwrap().starts_with("# created by neuromorph v"));
    assert_eq!(lines.next(), Some("# index type X Y Z radius parent"));
    assert_eq!(
        lines.collect::<Vec<_>>(),
        vec![
            "1 1 0 0 0 1 -1",
            "2 3 0 0 0 1 1",
            "3 3 0 4 0 1 2",
            "4 3 0 6 0 1 3",
            "5 3 2 8 0 1 4",
            "6 3 -2 8 0 1 4",
        ]
    );
}

#[test]
fn test_three_point_soma_written_with_shared_parent() {
    let morph = swc::parse_file(fixture("three_point_soma.swc"), &collecting_options()).unwrap();
    let content = swc::to_swc_string(&morph, &mut collecting()).unwrap().unwrap();
    let parents: Vec<&str> = content.lines().skip(2).take(3).map(|l| l.rsplit(' ').next().unwrap()).collect();
    assert_eq!(parents, vec!["-1", "1", "1"]);
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.swc");
    let morph = swc::parse_file(fixture("three_point_soma.swc"), &collecting_options()).unwrap();
    swc::write_file(&morph, &path, &WriteOptions::default()).unwrap();
    let reread = swc::parse_file(&path, &collecting_options()).unwrap();
    assert!(morph == reread);
}

#[test]
fn test_writer_rejects_unifurcation() {
    let level = |y: f64| PointLevel::with_diameters(vec![[0., y, 0.], [0., y + 1., 0.]], vec![1., 1.]).unwrap();
    let mut morph = MutableMorphology::new();
    morph.set_soma_point_level(PointLevel::with_diameters(vec![[0., 0., 0.]], vec![2.]).unwrap());
    let root = morph.append_root_section(level(0.), SectionType::Axon);
    morph.append_section(root, level(1.), SectionType::Axon).unwrap();

    let err = swc::to_swc_string(&morph, &mut collecting()).unwrap_err();
    assert!(matches!(err, MorphError::Write(WriteError::OnlyChild { parent }) if parent == root));
    assert!(err.to_string().contains("remove_unifurcations()"));
}

/// A dendrite forking at `[0, 5, 0]`; the first child is given its own start.
fn forked(first_child_start: [f64; 3], first_child_diameter: f64) -> MutableMorphology {
    let mut morph = MutableMorphology::new();
    let trunk = PointLevel::with_diameters(vec![[0., 0., 0.], [0., 5., 0.]], vec![2., 2.]).unwrap();
    let root = morph.append_root_section(trunk, SectionType::BasalDendrite);
    let first = PointLevel::with_diameters(vec![first_child_start, [1., 6., 0.]], vec![first_child_diameter, 1.]).unwrap();
    morph.append_section(root, first, SectionType::BasalDendrite).unwrap();
    let second = PointLevel::with_diameters(vec![[0., 5., 0.], [-1., 6., 0.]], vec![2., 2.]).unwrap();
    morph.append_section(root, second, SectionType::BasalDendrite).unwrap();
    morph
}

#[test]
fn test_writer_rejects_disconnected_section() {
    let err = swc::to_swc_string(&forked([9., 9., 9.], 2.), &mut collecting()).unwrap_err();
    assert!(matches!(err, MorphError::Write(WriteError::DisconnectedSection { section: 1, parent: 0 })));
    assert!(err.to_string().contains("does not start at the last point of its parent"));
}

#[test]
fn test_writer_keeps_duplicate_with_other_diameter() {
    let content = swc::to_swc_string(&forked([0., 5., 0.], 1.), &mut collecting()).unwrap().unwrap();
    assert_eq!(
        content.lines().skip(2).collect::<Vec<_>>(),
        vec![
            "1 3 0 0 0 1 -1",
            "2 3 0 5 0 1 1",
            "3 3 0 5 0 0.5 2",
            "4 3 1 6 0 0.5 3",
            "5 3 -1 6 0 1 2",
        ]
    );
    let reread = swc::parse_str_with(&content, "cell.swc", &collecting_options(), &mut collecting()).unwrap();
    assert_eq!(reread.section(1).unwrap().diameters(), &[1., 1.]);
    assert_eq!(reread.section(2).unwrap().points(), &[[0., 5., 0.], [-1., 6., 0.]]);
}

#[test]
fn test_writer_rejects_unifurcation_left_by_an_edit() {
    let mut morph = swc::parse_file(fixture("simple.swc"), &collecting_options()).unwrap();
    let parent = morph.section(2).unwrap().parent().unwrap();
    morph.delete_section(2, false).unwrap();

    let err = swc::to_swc_string(&morph, &mut collecting()).unwrap_err();
    assert!(matches!(err, MorphError::Write(WriteError::OnlyChild { parent: p }) if p == parent));

    neuromorph::sanitize::remove_unifurcations(&mut morph, &mut collecting()).unwrap();
    assert!(swc::to_swc_string(&morph, &mut collecting()).unwrap().is_some());
}

#[test]
fn test_sections_remember_their_first_line() {
    let mut morph = swc::parse_str(
        "# soma, a trunk and a fork\n\
         1 1 0 0 0 1 -1\n\
         2 3 0 1 0 1 1\n\
         3 3 0 2 0 1 2\n\
         4 3 1 3 0 1 3\n\
         5 3 -1 3 0 1 3\n",
    )
    .unwrap();
    let lines: Vec<Option<usize>> = morph.sections().map(|s| s.source_line()).collect();
    assert_eq!(lines, vec![Some(3), Some(5), Some(6)]);

    morph.delete_section(2, true).unwrap();
    neuromorph::sanitize::remove_unifurcations(&mut morph, &mut collecting()).unwrap();
    assert_eq!(morph.annotations().len(), 1);
    assert_eq!(morph.annotations()[0].line_number, 3);
    assert!(morph.to_immutable().to_mutable().sections().all(|s| s.source_line().is_none()));
}

#[test]
fn test_empty_morphology_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.swc");
    let mut diagnostics = collecting();
    swc::write_file_with(&MutableMorphology::new(), &path, &mut diagnostics).unwrap();
    assert!(!path.exists());
    assert_eq!(diagnostics.count(WarningKind::WriteEmptyMorphology), 1);
}
