mod fixtures;

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;

use archgraph_graph::{
    AccessKind, AccessRecord, AccessTarget, ClassDescriptor, MemberId, TryCatchBlock,
};
use archgraph_importer::{
    ClassFileImporter, ClassFileSource, ImportError, ImportOptions, MalformedPolicy,
};
use pretty_assertions::assert_eq;

use fixtures::{
    getstatic, invokespecial, invokestatic, putstatic, ClassFileBuilder, MethodCode, RETURN,
};

fn buffer(name: &str, bytes: Vec<u8>) -> ClassFileSource {
    ClassFileSource::Buffer { name: name.to_string(), bytes }
}

fn import(sources: &[ClassFileSource]) -> archgraph_importer::ImportResult {
    let _ = env_logger::builder().is_test(true).try_init();
    ClassFileImporter::new().import(sources).expect("import should succeed")
}

/// Class `com.example.A` whose `run()V` calls `com.example.B.go()V` and
/// reads `com.example.C.value`.
fn class_a() -> Vec<u8> {
    let mut builder = ClassFileBuilder::new("com/example/A");
    let go = builder.method_ref("com/example/B", "go", "()V");
    let value = builder.field_ref("com/example/C", "value", "I");

    let mut code = Vec::new();
    code.extend(invokestatic(go));
    code.extend(getstatic(value));
    code.push(RETURN);
    builder.method(
        "run",
        "()V",
        Some(MethodCode { code, exception_table: Vec::new(), line_numbers: vec![(0, 5)] }),
    );
    builder.build()
}

fn class_b() -> Vec<u8> {
    let mut builder = ClassFileBuilder::new("com/example/B");
    builder.method("go", "()V", Some(MethodCode { code: vec![RETURN], ..Default::default() }));
    builder.build()
}

#[test]
fn imports_classes_and_resolves_references() {
    let result = import(&[buffer("A.class", class_a()), buffer("B.class", class_b())]);
    assert!(result.failures.is_empty());
    assert!(result.diagnostics.is_empty());

    let a = result.graph.class("com.example.A").expect("A was imported");
    let run = a.method("run", "()V").expect("run()V exists");
    assert_eq!(run.accesses.len(), 2);

    let call = &run.accesses[0];
    assert_eq!(call.kind, AccessKind::MethodCall);
    assert_eq!(call.target.owner, ClassDescriptor::Resolved("com.example.B".to_string()));
    assert_eq!(call.line_number, 5);
    assert_eq!(
        call.description(),
        "com.example.A.run()V calls com.example.B.go()V in line 5"
    );

    let read = &run.accesses[1];
    assert_eq!(read.kind, AccessKind::FieldRead);
    assert_eq!(read.target.owner, ClassDescriptor::Stub("com.example.C".to_string()));

    // the unimported reference became exactly one stub carrying its name
    assert_eq!(result.graph.stub("com.example.C").expect("stub exists").name, "com.example.C");
    assert!(result.graph.class("com.example.C").is_none());
}

#[test]
fn field_writes_and_constructor_calls_are_classified() {
    let mut builder = ClassFileBuilder::new("com/example/Writer");
    builder.field("count", "I");
    let value = builder.field_ref("com/example/Writer", "count", "I");
    let init = builder.method_ref("com/example/Holder", "<init>", "()V");

    let mut code = Vec::new();
    code.extend(putstatic(value));
    code.extend(invokespecial(init));
    code.push(RETURN);
    builder.method(
        "update",
        "()V",
        Some(MethodCode { code, exception_table: Vec::new(), line_numbers: vec![(0, 8)] }),
    );
    builder.method(
        "<init>",
        "()V",
        Some(MethodCode { code: vec![RETURN], ..Default::default() }),
    );
    let result = import(&[buffer("Writer.class", builder.build())]);

    let class = result.graph.class("com.example.Writer").unwrap();
    let update = class.method("update", "()V").unwrap();
    assert_eq!(update.accesses[0].kind, AccessKind::FieldWrite);
    assert!(update.accesses[0].description().contains(" sets "));
    assert_eq!(update.accesses[1].kind, AccessKind::ConstructorCall);

    // the class's own <init> landed in the constructor list, not the methods
    assert!(class.method("<init>", "()V").is_none());
    assert!(class.constructor("()V").is_some());

    let field = class.field("count").expect("declared field exists");
    assert_eq!(field.descriptor, "I");
    assert!(field.modifiers.is_public());
}

#[test]
fn try_catch_block_carries_line_caught_type_and_enclosed_accesses() {
    // try { access X } catch (SomeException e) {}, try at line 10,
    // handler at line 15
    let mut builder = ClassFileBuilder::new("com/example/Guarded");
    let value = builder.field_ref("com/example/X", "value", "I");

    let mut code = Vec::new();
    code.extend(getstatic(value)); // pc 0..2, inside the try range
    code.push(RETURN); // pc 3, end of try
    code.push(RETURN); // pc 4, handler
    builder.method(
        "run",
        "()V",
        Some(MethodCode {
            code,
            exception_table: vec![(0, 3, 4, Some("com/example/SomeException".to_string()))],
            line_numbers: vec![(0, 10), (4, 15)],
        }),
    );
    let result = import(&[buffer("Guarded.class", builder.build())]);
    assert!(result.diagnostics.is_empty());

    let class = result.graph.class("com.example.Guarded").unwrap();
    let run = class.method("run", "()V").unwrap();

    let expected_access = AccessRecord {
        origin: MemberId {
            class_name: "com.example.Guarded".to_string(),
            name: "run".to_string(),
            descriptor: "()V".to_string(),
        },
        target: AccessTarget {
            owner: ClassDescriptor::Stub("com.example.X".to_string()),
            name: "value".to_string(),
            descriptor: "I".to_string(),
        },
        kind: AccessKind::FieldRead,
        line_number: 10,
    };
    let expected_block = TryCatchBlock {
        caught_throwables: BTreeSet::from([ClassDescriptor::Stub(
            "com.example.SomeException".to_string(),
        )]),
        line_number: 10,
        accesses: BTreeSet::from([expected_access.clone()]),
    };
    assert_eq!(run.try_catch_blocks, vec![expected_block]);
    assert_eq!(run.accesses, vec![expected_access]);
}

#[test]
fn nested_blocks_attribute_inner_accesses_to_every_enclosing_block() {
    let mut builder = ClassFileBuilder::new("com/example/Nested");
    let first = builder.field_ref("com/example/X", "first", "I");
    let second = builder.field_ref("com/example/X", "second", "I");
    let third = builder.field_ref("com/example/X", "third", "I");

    let mut code = Vec::new();
    code.extend(getstatic(first)); // pc 0, outer only
    code.extend(getstatic(second)); // pc 3, outer + inner
    code.extend(getstatic(third)); // pc 6, outer only
    code.push(RETURN); // pc 9
    code.push(RETURN); // pc 10, outer handler
    code.push(RETURN); // pc 11, inner handler
    builder.method(
        "run",
        "()V",
        Some(MethodCode {
            code,
            exception_table: vec![
                (0, 9, 10, Some("java/lang/Exception".to_string())),
                (3, 6, 11, Some("java/lang/Exception".to_string())),
            ],
            line_numbers: vec![(0, 20), (3, 21), (6, 22), (9, 23), (10, 24), (11, 25)],
        }),
    );
    let result = import(&[buffer("Nested.class", builder.build())]);

    let run = result
        .graph
        .class("com.example.Nested")
        .unwrap()
        .method("run", "()V")
        .unwrap();
    assert_eq!(run.try_catch_blocks.len(), 2);

    let outer = run.try_catch_blocks.iter().find(|b| b.line_number == 20).unwrap();
    let inner = run.try_catch_blocks.iter().find(|b| b.line_number == 21).unwrap();
    assert_eq!(outer.accesses.len(), 3);
    assert_eq!(inner.accesses.len(), 1);
    for access in &inner.accesses {
        assert!(outer.accesses.contains(access));
    }
}

#[test]
fn inconsistent_exception_metadata_only_affects_that_method() {
    let mut builder = ClassFileBuilder::new("com/example/Partial");
    let value = builder.field_ref("com/example/X", "value", "I");

    // no line number table at all: the block boundaries are finalized as
    // lineless and the block is dropped as a synthetic artifact
    let mut bad = Vec::new();
    bad.extend(getstatic(value));
    bad.push(RETURN);
    bad.push(RETURN);
    builder.method(
        "bad",
        "()V",
        Some(MethodCode {
            code: bad,
            exception_table: vec![(0, 3, 4, Some("java/lang/Exception".to_string()))],
            line_numbers: Vec::new(),
        }),
    );

    let mut good = Vec::new();
    good.extend(getstatic(value));
    good.push(RETURN);
    good.push(RETURN);
    builder.method(
        "good",
        "()V",
        Some(MethodCode {
            code: good,
            exception_table: vec![(0, 3, 4, Some("java/lang/Exception".to_string()))],
            line_numbers: vec![(0, 30), (4, 33)],
        }),
    );

    let result = import(&[buffer("Partial.class", builder.build())]);
    assert!(result.failures.is_empty());

    let class = result.graph.class("com.example.Partial").unwrap();
    assert_eq!(class.method("bad", "()V").unwrap().try_catch_blocks.len(), 0);
    assert_eq!(class.method("good", "()V").unwrap().try_catch_blocks.len(), 1);
    // the lineless accesses themselves are still part of the graph
    assert_eq!(class.method("bad", "()V").unwrap().accesses.len(), 1);
}

#[test]
fn malformed_files_are_collected_and_do_not_abort_the_run() {
    let sources = [
        buffer("broken.class", b"not a class file".to_vec()),
        buffer("B.class", class_b()),
    ];
    let result = import(&sources);

    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].location, "broken.class");
    assert!(result.graph.class("com.example.B").is_some());
}

#[test]
fn fail_fast_policy_turns_the_first_failure_fatal() {
    let sources = [
        buffer("broken.class", b"not a class file".to_vec()),
        buffer("B.class", class_b()),
    ];
    let importer = ClassFileImporter::with_options(ImportOptions {
        malformed_policy: MalformedPolicy::FailFast,
        ..Default::default()
    });

    let error = importer.import(&sources).unwrap_err();
    match error {
        ImportError::Malformed { location, .. } => assert_eq!(location, "broken.class"),
        other => panic!("expected Malformed, got {other:?}"),
    }
}

#[test]
fn reimporting_identical_input_produces_an_equal_graph() {
    let sources = [buffer("A.class", class_a()), buffer("B.class", class_b())];
    let first = import(&sources);
    let second = import(&sources);
    assert_eq!(first.graph, second.graph);
}

#[test]
fn imports_from_directories_and_archives() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let package = dir.path().join("com/example");
    fs::create_dir_all(&package).expect("create package dirs");
    fs::write(package.join("A.class"), class_a()).expect("write A.class");

    let jar_path = dir.path().join("lib.jar");
    {
        let jar = fs::File::create(&jar_path).expect("create jar");
        let mut writer = zip::ZipWriter::new(jar);
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        writer
            .start_file("com/example/B.class", options)
            .expect("start jar entry");
        writer.write_all(&class_b()).expect("write jar entry");
        writer.finish().expect("finish jar");
    }

    let result = import(&[
        ClassFileSource::Directory(dir.path().join("com")),
        ClassFileSource::Archive(jar_path),
    ]);
    assert!(result.graph.class("com.example.A").is_some());
    assert!(result.graph.class("com.example.B").is_some());
}

#[test]
fn missing_sources_are_fatal() {
    let importer = ClassFileImporter::new();
    let error = importer
        .import(&[ClassFileSource::Directory("/does/not/exist".into())])
        .unwrap_err();
    assert!(matches!(error, ImportError::SourceNotFound(_)));
}

#[test]
fn stubs_are_enriched_from_the_auxiliary_classpath_without_full_import() {
    let aux = tempfile::tempdir().expect("create temp dir");
    let package = aux.path().join("com/example");
    fs::create_dir_all(&package).expect("create package dirs");
    fs::write(package.join("B.class"), class_b()).expect("write B.class");

    let importer = ClassFileImporter::with_options(ImportOptions {
        auxiliary_classpath: vec![aux.path().to_path_buf()],
        ..Default::default()
    });
    let result = importer
        .import(&[buffer("A.class", class_a())])
        .expect("import succeeds");

    // B stays a stub: the auxiliary classpath never triggers a full import
    assert!(result.graph.class("com.example.B").is_none());
    let stub = result.graph.stub("com.example.B").expect("stub exists");
    assert_eq!(stub.superclass_name.as_deref(), Some("java.lang.Object"));
    assert!(stub.modifiers.expect("enriched modifiers").is_public());
}
