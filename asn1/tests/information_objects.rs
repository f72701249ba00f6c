use asn1_ios::{
    ast::{DefinitionState, ObjectSetKind, Setting},
    AnalysisContext, AnalysisError, AsnCompiler, CodegenError, CompilationTimeStamp, Level,
};

const OPERATIONS: &str = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS {
        &code INTEGER UNIQUE,
        &ArgType OPTIONAL
    }

    op1 OPERATION ::= { &code 1, &ArgType INTEGER }
    op2 OPERATION ::= { &code 2, &ArgType BOOLEAN }
    Ops OPERATION ::= { op1 | op2 }

    Invoke ::= SEQUENCE {
        code OPERATION.&code ({Ops}),
        arg OPERATION.&ArgType ({Ops}{@code}) OPTIONAL
    }
END
";

fn compiler(source: &str) -> AsnCompiler {
    let mut compiler = AsnCompiler::new();
    compiler
        .add_file("test.asn".to_string(), source.to_string())
        .expect("module parses");
    compiler
}

fn codes(analysis: &AnalysisContext) -> Vec<&'static str> {
    analysis.errors().iter().map(|e| e.code()).collect()
}

fn alternatives(analysis: &mut AnalysisContext, ty: &str, path: &[&str]) -> Vec<String> {
    let component = analysis
        .component_type("Test", ty, path)
        .expect("component exists");
    analysis
        .open_type_alternatives(component)
        .into_iter()
        .map(|(name, _)| name)
        .collect()
}

fn cycle_paths(analysis: &AnalysisContext) -> Vec<String> {
    analysis
        .errors()
        .iter()
        .filter_map(|e| match e {
            AnalysisError::Circular { path, .. } => Some(path.clone()),
            _ => None,
        })
        .collect()
}

fn object_names(analysis: &mut AnalysisContext, set: &str) -> Vec<String> {
    let set = analysis.object_set("Test", set).expect("object set exists");
    analysis
        .object_set_objects(set)
        .into_iter()
        .map(|o| analysis.object_name(o).to_string())
        .collect()
}

#[test]
fn component_relation_gives_open_type_alternatives() {
    let mut compiler = compiler(OPERATIONS);
    let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));
    assert!(analysis.errors().is_empty(), "{:?}", analysis.errors());

    assert_eq!(alternatives(&mut analysis, "Invoke", &["arg"]), vec!["iNTEGER", "bOOLEAN"]);
    assert!(alternatives(&mut analysis, "Invoke", &["code"]).is_empty());
}

#[test]
fn alternative_names_are_stable_across_timestamps() {
    let mut compiler = compiler(OPERATIONS);

    let first = {
        let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));
        alternatives(&mut analysis, "Invoke", &["arg"])
    };
    let second = {
        let mut analysis = compiler.analysis(CompilationTimeStamp::new(2));
        alternatives(&mut analysis, "Invoke", &["arg"])
    };

    assert_eq!(first, second);
}

#[test]
fn checking_again_adds_no_diagnostics() {
    let source = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS { &code INTEGER UNIQUE, &ArgType OPTIONAL }
    op1 OPERATION ::= { &ArgType INTEGER }
    Ops OPERATION ::= { op1 | Missing }
END
";
    let mut compiler = compiler(source);
    let timestamp = CompilationTimeStamp::new(1);

    let first = compiler.analysis(timestamp).diagnostics();
    assert!(!first.is_empty());
    let again = compiler.analysis(timestamp).diagnostics();
    assert_eq!(first, again);
    let later = compiler.analysis(timestamp.next()).diagnostics();
    assert_eq!(first, later);
}

#[test]
fn nested_sets_are_flattened_without_duplicates() {
    let source = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS { &code INTEGER UNIQUE, &ArgType OPTIONAL }
    op1 OPERATION ::= { &code 1 }
    op2 OPERATION ::= { &code 2 }
    Inner OPERATION ::= { op1 | op2 }
    Outer OPERATION ::= { op1 | Inner, ... }
END
";
    let mut compiler = compiler(source);
    let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));
    assert!(analysis.errors().is_empty(), "{:?}", analysis.errors());

    assert_eq!(object_names(&mut analysis, "Outer"), vec!["op1", "op2"]);

    let outer = analysis.object_set("Test", "Outer").unwrap();
    assert_eq!(analysis.get_nof_objects(outer), 2);
    let second = analysis.get_object_by_index(outer, 1).unwrap();
    assert_eq!(analysis.object_name(second), "op2");
    assert!(analysis.get_object_by_index(outer, 2).is_none());
}

#[test]
fn identical_definitions_stay_distinct() {
    let source = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS { &code INTEGER UNIQUE }
    op1 OPERATION ::= { &code 1 }
    First OPERATION ::= { op1 }
    Second OPERATION ::= { op1 }
END
";
    let mut compiler = compiler(source);
    let timestamp = CompilationTimeStamp::new(1);

    let (first, second) = {
        let mut analysis = compiler.analysis(timestamp);
        let first = analysis.object_set("Test", "First").unwrap();
        let second = analysis.object_set("Test", "Second").unwrap();

        assert_eq!(object_names(&mut analysis, "First"), object_names(&mut analysis, "Second"));
        assert!(analysis.object_sets_equivalent(first, first));
        assert!(!analysis.object_sets_equivalent(first, second));
        (first, second)
    };

    let ast = compiler.ast();
    assert_eq!(ast[first].state(timestamp), Some(DefinitionState::Flattened));
    assert_eq!(ast[second].state(timestamp.next()), Some(DefinitionState::Parsed));
}

#[test]
fn mutually_referencing_sets_report_one_cycle() {
    let source = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS { &code INTEGER UNIQUE }
    A OPERATION ::= { B }
    B OPERATION ::= { A }
END
";
    let mut compiler = compiler(source);
    let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));

    assert_eq!(cycle_paths(&analysis), vec!["`A` -> `B` -> `A`"], "{:?}", analysis.errors());
    assert!(object_names(&mut analysis, "A").is_empty());
    assert!(object_names(&mut analysis, "B").is_empty());
}

#[test]
fn cycle_through_sets_with_objects_stays_finite() {
    let source = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS { &code INTEGER UNIQUE }
    op1 OPERATION ::= { &code 1 }
    op2 OPERATION ::= { &code 2 }
    A OPERATION ::= { op1 | B }
    B OPERATION ::= { op2 | A }
END
";
    let mut compiler = compiler(source);
    let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));

    assert_eq!(codes(&analysis), vec!["E102"]);
    assert_eq!(cycle_paths(&analysis), vec!["`A` -> `B` -> `A`"]);
    assert_eq!(object_names(&mut analysis, "A"), vec!["op1"]);
    assert_eq!(object_names(&mut analysis, "B"), vec!["op2", "op1"]);
}

#[test]
fn nested_sets_of_another_class_are_excluded() {
    let source = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS { &code INTEGER UNIQUE }
    ERROR ::= CLASS { &code INTEGER UNIQUE }
    op1 OPERATION ::= { &code 1 }
    err1 ERROR ::= { &code 2 }
    Errors ERROR ::= { err1 }
    Ops OPERATION ::= { op1 | Errors }
END
";
    let mut compiler = compiler(source);
    let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));

    assert_eq!(codes(&analysis), vec!["E114"]);
    assert!(matches!(analysis.errors()[0], AnalysisError::ObjectSetGovernor { .. }));
    assert!(analysis.errors()[0]
        .to_string()
        .starts_with("objectsets of objectclass `OPERATION` expected"));
    assert_eq!(object_names(&mut analysis, "Ops"), vec!["op1"]);
    assert_eq!(object_names(&mut analysis, "Errors"), vec!["err1"]);
}

#[test]
fn objects_of_another_class_are_excluded() {
    let source = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS { &code INTEGER UNIQUE }
    ERROR ::= CLASS { &code INTEGER UNIQUE }
    op1 OPERATION ::= { &code 1 }
    err1 ERROR ::= { &code 2 }
    Ops OPERATION ::= { op1 | err1 }
END
";
    let mut compiler = compiler(source);
    let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));

    assert_eq!(codes(&analysis), vec!["E114"]);
    assert_eq!(object_names(&mut analysis, "Ops"), vec!["op1"]);
}

#[test]
fn optional_and_default_field_becomes_mandatory() {
    let source = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS { &code INTEGER OPTIONAL DEFAULT 5 }
END
";
    let mut compiler = compiler(source);
    let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));

    assert_eq!(codes(&analysis), vec!["E110"]);
    let class = analysis.class("Test", "OPERATION").unwrap();
    let field = &analysis.ast()[class].fields["&code"];
    assert!(!field.optional);
    assert!(field.default.is_some());
}

#[test]
fn unique_and_default_field_is_no_longer_unique() {
    let source = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS { &code INTEGER UNIQUE DEFAULT 1 }
END
";
    let mut compiler = compiler(source);
    let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));

    assert_eq!(codes(&analysis), vec!["E110"]);
    assert!(matches!(analysis.errors()[0], AnalysisError::UniqueAndDefault { .. }));
    let class = analysis.class("Test", "OPERATION").unwrap();
    let field = &analysis.ast()[class].fields["&code"];
    assert!(!field.unique);
    assert!(field.default.is_some());
}

#[test]
fn setting_of_the_wrong_kind_is_reported() {
    let source = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS { &code INTEGER UNIQUE }
    op1 OPERATION ::= { &code INTEGER }
    Ops OPERATION ::= { op1 }
END
";
    let mut compiler = compiler(source);
    let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));

    assert_eq!(codes(&analysis), vec!["E111"]);
    assert_eq!(
        analysis.errors()[0].to_string(),
        "fixed-type value setting expected for field `&code`, found type"
    );
    assert!(object_names(&mut analysis, "Ops").is_empty());
}

#[test]
fn value_that_does_not_fit_its_field_excludes_the_object() {
    let source = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS { &code INTEGER UNIQUE }
    op1 OPERATION ::= { &code TRUE }
    op2 OPERATION ::= { &code 2 }
    Ops OPERATION ::= { op1 | op2 }
END
";
    let mut compiler = compiler(source);
    let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));

    assert_eq!(codes(&analysis), vec!["E120"]);
    let op1 = analysis.object("Test", "op1").unwrap();
    assert!(analysis.ast()[op1].erroneous);
    assert_eq!(object_names(&mut analysis, "Ops"), vec!["op2"]);
}

#[test]
fn reference_to_a_type_gives_an_empty_set_of_the_expected_class() {
    let source = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS { &code INTEGER UNIQUE }
    NotASet ::= INTEGER
    Bad OPERATION ::= NotASet
END
";
    let mut compiler = compiler(source);
    let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));

    assert_eq!(codes(&analysis), vec!["E104"]);
    assert!(analysis.errors()[0].to_string().starts_with("ObjectSet reference expected"));

    let bad = analysis.object_set("Test", "Bad").unwrap();
    assert_eq!(analysis.get_nof_objects(bad), 0);

    let ast = analysis.ast();
    let ObjectSetKind::Referenced(referenced) = &ast[bad].kind else {
        panic!("expected a referenced object set");
    };
    let fallback = referenced.fallback.expect("fallback set was created");
    assert_eq!(ast[fallback].governor, ast[bad].governor);
    assert!(ast[fallback].definition().unwrap().elements.is_empty());
}

#[test]
fn missing_and_unknown_fields_are_reported() {
    let source = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS { &code INTEGER UNIQUE, &ArgType OPTIONAL }
    op1 OPERATION ::= { &ArgType INTEGER, &result 5 }
END
";
    let mut compiler = compiler(source);
    let analysis = compiler.analysis(CompilationTimeStamp::new(1));

    let mut codes = codes(&analysis);
    codes.sort_unstable();
    assert_eq!(codes, vec!["E112", "E112"]);
}

#[test]
fn field_settings_fall_back_to_class_defaults() {
    let source = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS { &code INTEGER UNIQUE, &priority INTEGER DEFAULT 3 }
    op1 OPERATION ::= { &code 1 }
END
";
    let mut compiler = compiler(source);
    let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));
    assert!(analysis.errors().is_empty(), "{:?}", analysis.errors());

    let op1 = analysis.object("Test", "op1").unwrap();
    assert!(analysis.field_setting_with_name(op1, "&priority").is_some());
    assert!(analysis.field_setting_with_name(op1, "&missing").is_none());
}

#[test]
fn with_syntax_objects() {
    let source = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS { &code INTEGER UNIQUE, &ArgType OPTIONAL }
        WITH SYNTAX { [ARGUMENT &ArgType] CODE &code }
    op1 OPERATION ::= { ARGUMENT INTEGER CODE 1 }
    op2 OPERATION ::= { CODE 2 }
    Ops OPERATION ::= { op1 | op2 }
END
";
    let mut compiler = compiler(source);
    let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));
    assert!(analysis.errors().is_empty(), "{:?}", analysis.errors());

    assert_eq!(object_names(&mut analysis, "Ops"), vec!["op1", "op2"]);
    let op2 = analysis.object("Test", "op2").unwrap();
    assert!(analysis.field_setting_with_name(op2, "&ArgType").is_none());
}

#[test]
fn builtin_class_from_the_prelude() {
    let source = "
Test DEFINITIONS ::= BEGIN
    Syntaxes TYPE-IDENTIFIER ::= {
        { INTEGER IDENTIFIED BY { 1 2 3 } } |
        { BOOLEAN IDENTIFIED BY { 1 2 4 } }
    }
END
";
    let mut compiler = compiler(source);
    let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));
    assert!(analysis.errors().is_empty(), "{:?}", analysis.errors());

    let set = analysis.object_set("Test", "Syntaxes").unwrap();
    assert_eq!(analysis.get_nof_objects(set), 2);
}

#[test]
fn parameterized_types_take_their_object_set() {
    let source = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS { &code INTEGER UNIQUE, &ArgType OPTIONAL }
    op1 OPERATION ::= { &code 1, &ArgType OCTET STRING }
    Ops OPERATION ::= { op1 }

    Wrapper { OPERATION : Set } ::= SEQUENCE {
        code OPERATION.&code ({Set}),
        arg OPERATION.&ArgType ({Set}{@code})
    }
    Message ::= Wrapper { Ops }
END
";
    let mut compiler = compiler(source);
    let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));
    assert!(analysis.errors().is_empty(), "{:?}", analysis.errors());

    assert!(matches!(analysis.setting("Test", "Wrapper"), Some(Setting::Parameterized)));
    assert_eq!(alternatives(&mut analysis, "Message", &["arg"]), vec!["oCTET_STRING"]);
}

#[test]
fn at_notation_must_name_a_constrained_sibling() {
    let source = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS { &code INTEGER UNIQUE, &ArgType OPTIONAL }
    Ops OPERATION ::= { }
    Invoke ::= SEQUENCE {
        code INTEGER,
        arg OPERATION.&ArgType ({Ops}{@code}),
        other OPERATION.&ArgType ({Ops}{@missing})
    }
END
";
    let mut compiler = compiler(source);
    let analysis = compiler.analysis(CompilationTimeStamp::new(1));

    let mut codes = codes(&analysis);
    codes.sort_unstable();
    assert_eq!(codes, vec!["E131", "E132"]);
}

#[test]
fn at_notation_cannot_leave_the_outermost_type() {
    let source = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS { &code INTEGER UNIQUE, &ArgType OPTIONAL }
    op1 OPERATION ::= { &code 1, &ArgType INTEGER }
    Ops OPERATION ::= { op1 }
    Invoke ::= SEQUENCE {
        code OPERATION.&code ({Ops}),
        arg OPERATION.&ArgType ({Ops}{@..code})
    }
END
";
    let mut compiler = compiler(source);
    let analysis = compiler.analysis(CompilationTimeStamp::new(1));

    assert_eq!(codes(&analysis), vec!["E131"]);
    assert!(matches!(
        analysis.errors()[0],
        AnalysisError::TooManyDots { available: 1, .. }
    ));
}

#[test]
fn open_type_without_alternatives_is_a_warning() {
    let source = "
Test DEFINITIONS ::= BEGIN
    OPERATION ::= CLASS { &code INTEGER UNIQUE, &ArgType OPTIONAL }
    op1 OPERATION ::= { &code 1 }
    Ops OPERATION ::= { op1 }
    Invoke ::= SEQUENCE {
        code OPERATION.&code ({Ops}),
        arg OPERATION.&ArgType ({Ops}{@code}) OPTIONAL
    }
END
";
    let mut compiler = compiler(source);
    let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));

    assert_eq!(codes(&analysis), vec!["W130"]);
    assert_eq!(analysis.errors()[0].level(), Level::Warning);
    assert_eq!(analysis.diagnostics()[0].level, Level::Warning);
    assert!(!analysis.has_errors());
    assert!(alternatives(&mut analysis, "Invoke", &["arg"]).is_empty());
    assert!(analysis.rust_codegen().is_ok());
}

#[test]
fn codegen_lists_classes_sets_and_alternatives() {
    let mut compiler = compiler(OPERATIONS);
    let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));

    let code = analysis.rust_codegen().expect("code is generated");
    assert!(code.contains("pub mod test {"));
    assert!(code.contains("pub struct Operation {"));
    assert!(code.contains("pub arg_type: Option<&'static str>,"));
    assert!(code.contains("pub const OPS: &[super::test::Operation] = &["));
    assert!(code.contains("Self::Integer => \"iNTEGER\","));
    assert!(code.contains("Self::Boolean => \"bOOLEAN\","));
}

#[test]
fn codegen_refuses_erroneous_input() {
    let mut compiler = compiler(
        "Test DEFINITIONS ::= BEGIN
            Ops OPERATION ::= { }
        END",
    );
    let mut analysis = compiler.analysis(CompilationTimeStamp::new(1));

    assert_eq!(analysis.rust_codegen(), Err(CodegenError::AnalysisErrors));
}
