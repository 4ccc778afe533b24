//! End-to-end behaviour of the DesignedForInheritance rule through the public API

use rstest::rstest;
use sealed_guardian::semantic::{NamespaceSymbol, TypeSymbol};
use sealed_guardian::syntax::AttributeReference;
use sealed_guardian::{
    Analyzer, ClassificationKind, Classifier, FixKind, GuardianConfig, GuardianValidator,
    ProjectAnalysis, ResolvedType, SourceDocument, TypeIndex,
};

fn analyze(source: &str) -> (Analyzer, ProjectAnalysis) {
    let analyzer = Analyzer::with_defaults().unwrap();
    let analysis = analyzer.analyze_sources([("Test0.cs", source)]).unwrap();
    (analyzer, analysis)
}

fn kinds(source: &str) -> Vec<ClassificationKind> {
    let (_, analysis) = analyze(source);
    analysis.files[0]
        .classifications
        .iter()
        .map(|c| c.kind)
        .collect()
}

fn fixed_text(source: &str) -> String {
    let (analyzer, analysis) = analyze(source);
    let outcome = analyzer.fix_file(&analysis.files[0]).unwrap();
    outcome.document.unwrap().text.to_string()
}

#[test]
fn no_good_if_no_modifier_and_no_attribute() {
    let (analyzer, analysis) = analyze("namespace TestCase\n{\n    public class Example { }\n}\n");
    let violations = analyzer.violations_for(&analysis.files[0]);

    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].rule_id, "DesignedForInheritance");
    assert_eq!(
        violations[0].message,
        "Class 'Example' must be abstract, sealed or static, or be marked with [DesignedForInheritance]"
    );
    assert_eq!(violations[0].line_number, Some(3));
    assert_eq!(violations[0].column_number, Some(18));
}

#[rstest]
#[case::short_name(
    "using ProductiveRage.SealedClassVerification;\n\nnamespace TestCase\n{\n    [DesignedForInheritance]\n    public class Example { }\n}\n"
)]
#[case::suffixed_name(
    "using ProductiveRage.SealedClassVerification;\n\nnamespace TestCase\n{\n    [DesignedForInheritanceAttribute]\n    public class Example { }\n}\n"
)]
#[case::fully_qualified(
    "namespace TestCase\n{\n    [ProductiveRage.SealedClassVerification.DesignedForInheritance]\n    public class Example { }\n}\n"
)]
#[case::unrelated_imports(
    "using System;\nusing System.Collections.Generic;\nusing ProductiveRage.SealedClassVerification;\n\nnamespace TestCase\n{\n    [Serializable, DesignedForInheritance]\n    public class Example { }\n}\n"
)]
#[case::abstract_class("namespace TestCase\n{\n    public abstract class Example { }\n}\n")]
#[case::sealed_class("namespace TestCase\n{\n    public sealed class Example { }\n}\n")]
#[case::static_class("namespace TestCase\n{\n    static class Example { }\n}\n")]
fn acceptable_declarations_pass(#[case] source: &str) {
    assert_eq!(kinds(source), vec![ClassificationKind::Pass]);
}

#[test]
fn does_not_apply_to_structs() {
    let (_, analysis) = analyze(
        "namespace TestCase\n{\n    public struct Example { }\n    public record struct Point(int X);\n    public interface IShape { }\n}\n",
    );
    assert_eq!(analysis.total_classes(), 0);
}

#[rstest]
#[case::abstract_class("abstract")]
#[case::sealed_class("sealed")]
#[case::static_class("static")]
fn do_not_use_attribute_with_closed_class(#[case] modifier: &str) {
    let source = format!(
        "using ProductiveRage.SealedClassVerification;\n\nnamespace TestCase\n{{\n    [DesignedForInheritance]\n    public {modifier} class Example {{ }}\n}}\n"
    );
    let (analyzer, analysis) = analyze(&source);

    assert_eq!(
        analysis.files[0].classifications[0].kind,
        ClassificationKind::MarkerOnClosedClass
    );
    let violations = analyzer.violations_for(&analysis.files[0]);
    assert_eq!(
        violations[0].message,
        "Class 'Example' is abstract, sealed or static and must not be marked with [DesignedForInheritance]"
    );

    // Intent cannot be inferred, so nothing is fixed automatically
    let outcome = analyzer.fix_file(&analysis.files[0]).unwrap();
    assert!(!outcome.is_changed());
    assert_eq!(outcome.skipped, 1);
}

#[test]
fn seal_class_is_the_default_fix() {
    assert_eq!(
        fixed_text("namespace TestCase\n{\n    public class Example { }\n}\n"),
        "namespace TestCase\n{\n    public sealed class Example { }\n}\n"
    );
}

#[test]
fn virtual_members_add_attribute_and_import() {
    let source = r#"namespace TestCase
{
    public class Example
    {
        public virtual string GetName()
        {
            return "Default";
        }
    }
}
"#;
    let expected = r#"using ProductiveRage.SealedClassVerification;

namespace TestCase
{
    [DesignedForInheritance]
    public class Example
    {
        public virtual string GetName()
        {
            return "Default";
        }
    }
}
"#;
    assert_eq!(fixed_text(source), expected);
    assert_eq!(kinds(expected), vec![ClassificationKind::Pass]);
}

#[test]
fn existing_import_is_not_duplicated() {
    let source = r#"using ProductiveRage.SealedClassVerification;

namespace TestCase
{
    public class Example
    {
        public virtual string GetName()
        {
            return "Default";
        }
    }
}
"#;
    let expected = r#"using ProductiveRage.SealedClassVerification;

namespace TestCase
{
    [DesignedForInheritance]
    public class Example
    {
        public virtual string GetName()
        {
            return "Default";
        }
    }
}
"#;
    assert_eq!(fixed_text(source), expected);
}

#[test]
fn foreign_attribute_with_the_same_name_does_not_count() {
    let source = r#"using ProductiveRage.SealedClassVerification;

namespace TestCase
{
    public sealed class DesignedForInheritanceAttribute : System.Attribute { }

    [DesignedForInheritance]
    public class Example { }
}
"#;
    let (analyzer, analysis) = analyze(source);
    let violations = analyzer.violations_for(&analysis.files[0]);

    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].class_name.as_deref(), Some("Example"));
}

#[test]
fn unresolvable_marker_is_not_marked() {
    let config = GuardianConfig {
        metadata_references: Vec::new(),
        ..GuardianConfig::default()
    };
    let analyzer = Analyzer::new(config).unwrap();
    let analysis = analyzer
        .analyze_sources([(
            "Test0.cs",
            "using ProductiveRage.SealedClassVerification;\n[DesignedForInheritance]\npublic class Example { }\n",
        )])
        .unwrap();

    assert_eq!(
        analysis.files[0].classifications[0].kind,
        ClassificationKind::MissingMarker
    );
}

#[test]
fn fix_all_adds_one_import_for_many_classes() {
    let source = "namespace TestCase\n{\n    public class A { public virtual void M() { } }\n    public class B { protected virtual int P { get; } }\n    public class C { }\n}\n";
    let (analyzer, analysis) = analyze(source);
    let outcome = analyzer.fix_file(&analysis.files[0]).unwrap();

    let kinds: Vec<_> = outcome.fixes.iter().map(|f| f.kind).collect();
    assert_eq!(kinds, vec![FixKind::AddMarker, FixKind::AddMarker, FixKind::Seal]);

    let fixed = outcome.document.unwrap();
    assert_eq!(
        fixed
            .text
            .matches("using ProductiveRage.SealedClassVerification;")
            .count(),
        1
    );

    let reanalyzed = analyzer
        .analyze_sources([("Test0.cs", &*fixed.text)])
        .unwrap();
    assert!(analyzer.report(&reanalyzed).violations.is_empty());
}

#[test]
fn classifier_accepts_a_stub_semantic_model() {
    let document = SourceDocument::parse(
        "Test0.cs",
        "[DesignedForInheritance]\npublic class Example { }\n",
    )
    .unwrap();
    let classes = document.root.classes();
    let class = &classes[0];
    let classifier = Classifier::default();

    let unresolved = |_: &AttributeReference| ResolvedType::Error;
    let marker = |_: &AttributeReference| {
        ResolvedType::Type(TypeSymbol::new(
            "DesignedForInheritanceAttribute",
            "ProductiveRage.SealedClassVerification.DesignedForInheritanceAttribute",
            NamespaceSymbol::from_path("ProductiveRage.SealedClassVerification"),
        ))
    };

    assert_eq!(
        classifier.classify(class, &unresolved).unwrap().kind,
        ClassificationKind::MissingMarker
    );
    assert_eq!(
        classifier.classify(class, &marker).unwrap().kind,
        ClassificationKind::Pass
    );
}

#[test]
fn index_resolves_across_documents() {
    let marker = SourceDocument::parse(
        "Marker.cs",
        "namespace ProductiveRage.SealedClassVerification { public sealed class DesignedForInheritanceAttribute : System.Attribute { } }",
    )
    .unwrap();
    let user = SourceDocument::parse(
        "Example.cs",
        "using ProductiveRage.SealedClassVerification;\n[DesignedForInheritance]\npublic class Example { }\n",
    )
    .unwrap();

    let index = TypeIndex::from_documents([&marker, &user], &[]).unwrap();
    let example = user
        .root
        .classes()
        .into_iter()
        .find(|c| c.name == "Example")
        .unwrap();

    assert_eq!(
        Classifier::default().classify(&example, &index).unwrap().kind,
        ClassificationKind::Pass
    );
}

#[test]
fn import_is_not_added_inside_conditional_block() {
    let source = "#if DEBUG\nusing System.Diagnostics;\n#endif\n\npublic class Example { public virtual void M() { } }\n";
    let fixed = fixed_text(source);

    assert_eq!(
        fixed,
        "#if DEBUG\nusing System.Diagnostics;\n#endif\n\nusing ProductiveRage.SealedClassVerification;\n\n[DesignedForInheritance]\npublic class Example { public virtual void M() { } }\n"
    );
    assert_eq!(kinds(&fixed), vec![ClassificationKind::Pass]);
}

#[test]
fn conditional_import_of_marker_namespace_is_not_trusted() {
    let source = "using System;\n#if DEBUG\nusing ProductiveRage.SealedClassVerification;\n#endif\n\npublic class Example { public virtual void M() { } }\n";
    let fixed = fixed_text(source);

    assert!(fixed.starts_with("using System;\nusing ProductiveRage.SealedClassVerification;\n#if DEBUG\n"));
}

#[test]
fn doc_comment_stays_with_its_class() {
    let source = "/// <summary>Base for shapes</summary>\npublic class Shape\n{\n    public virtual double Area() => 0;\n}\n";
    let (analyzer, analysis) = analyze(source);
    let fixed = analyzer
        .fix_file(&analysis.files[0])
        .unwrap()
        .document
        .unwrap();

    assert_eq!(
        &*fixed.text,
        "using ProductiveRage.SealedClassVerification;\n\n/// <summary>Base for shapes</summary>\n[DesignedForInheritance]\npublic class Shape\n{\n    public virtual double Area() => 0;\n}\n"
    );
}

#[test]
fn file_scoped_namespace_gets_import_above_it() {
    let source = "namespace TestCase;\n\npublic class Example\n{\n    public virtual void M() { }\n}\n";
    let fixed = fixed_text(source);

    assert_eq!(
        fixed,
        "using ProductiveRage.SealedClassVerification;\n\nnamespace TestCase;\n\n[DesignedForInheritance]\npublic class Example\n{\n    public virtual void M() { }\n}\n"
    );
    assert_eq!(kinds(&fixed), vec![ClassificationKind::Pass]);
}

#[test]
fn global_using_in_another_file_resolves_the_marker() {
    let analyzer = Analyzer::with_defaults().unwrap();
    let analysis = analyzer
        .analyze_sources([
            (
                "GlobalUsings.cs",
                "global using ProductiveRage.SealedClassVerification;\n",
            ),
            (
                "Example.cs",
                "namespace TestCase\n{\n    [DesignedForInheritance]\n    public class Example\n    {\n        public virtual void M() { }\n    }\n}\n",
            ),
        ])
        .unwrap();

    let example = &analysis.files[1];
    assert_eq!(example.classifications[0].kind, ClassificationKind::Pass);
    assert!(analyzer.report(&analysis).violations.is_empty());
}

#[test]
fn global_using_suppresses_a_duplicate_import() {
    let source = "global using ProductiveRage.SealedClassVerification;\n\npublic class Example { public virtual void M() { } }\n";
    assert_eq!(
        fixed_text(source),
        "global using ProductiveRage.SealedClassVerification;\n\n[DesignedForInheritance]\npublic class Example { public virtual void M() { } }\n"
    );
}

#[test]
fn single_file_check_sees_shadowing_sibling() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let root = temp_dir.path();
    std::fs::write(root.join("App.csproj"), "<Project Sdk=\"Microsoft.NET.Sdk\" />\n").unwrap();
    std::fs::write(
        root.join("Shadow.cs"),
        "namespace TestCase\n{\n    public sealed class DesignedForInheritanceAttribute : System.Attribute { }\n}\n",
    )
    .unwrap();
    std::fs::write(
        root.join("Example.cs"),
        "using ProductiveRage.SealedClassVerification;\n\nnamespace TestCase\n{\n    [DesignedForInheritance]\n    public class Example { }\n}\n",
    )
    .unwrap();

    let validator = GuardianValidator::new().unwrap();
    let report = validator.validate_file(root.join("Example.cs")).unwrap();

    assert_eq!(report.summary.total_files, 1);
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].class_name.as_deref(), Some("Example"));
}
