//! Assembler: JSON documents to metadata, validation, and end-to-end activation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use conjure_rs::assembler::document::ContainerNode;
use conjure_rs::{
    Assembler, AssemblyError, Component, ConfigParser, ContainerCreator, ContainerKind, ContainerMeta,
    CoreError, Definition, Event, JsonParser, Locator, ParameterCollection, Signature, SymbolTable,
    Transformer, TypeTag, TypeTransformer, Value,
};
use serde_json::json;

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("conjure-{}-{}", std::process::id(), name));
    fs::write(&path, contents).unwrap();
    path
}

fn bakery() -> SymbolTable {
    let mut table = SymbolTable::new();
    table.register(
        "shop.Oven",
        Signature::new()
            .param("temperature")
            .annotate("temperature", TypeTag::Integer),
        |args| {
            let temperature = args.data("temperature").and_then(|v| v.as_i64()).unwrap_or_default();
            Ok(Component::new("Oven")
                .method("bake", Signature::new().param("item"), move |args| {
                    let item = args.data("item").and_then(|v| v.as_str()).unwrap_or_default();
                    Ok(json!(format!("{item} at {temperature}")).into())
                })
                .into_instance()
                .into())
        },
    );
    table.register("shop.Timer", Signature::new(), |_| {
        Ok(Component::new("Timer")
            .method("ring", Signature::new().param("result"), |args| {
                let result = args.data("result").and_then(|v| v.as_str()).unwrap_or_default();
                Ok(json!(format!("{result} *ding*")).into())
            })
            .into_instance()
            .into())
    });
    table
}

const BAKERY: &str = r#"{
  "containers": [
    {
      "kind": "entity",
      "id": "oven",
      "class": "shop.Oven",
      "params": [{ "name": "temperature", "type": "int", "value": "220" }]
    },
    {
      "kind": "entity",
      "id": "timer",
      "class": "shop.Timer",
      "interceptions": [{ "post": "oven", "do": "bake", "with": "ring" }]
    },
    {
      "kind": "factorisation",
      "id": "bread",
      "with": "oven",
      "call": "bake",
      "params": [{ "value": "bread" }],
      "factory_mode": true
    }
  ]
}"#;

#[test]
fn parses_every_container_kind() {
    let containers = JsonParser::new()
        .parse_str(
            r#"{"containers": [
                {"kind": "entity", "id": "a", "class": "app.A", "params": [{"ref": "b"}]},
                {"kind": "factorization", "id": "b", "with": "a", "call": "make"},
                {"kind": "callable", "id": "c", "with": "app.sum", "factory_mode": true}
            ]}"#,
        )
        .unwrap();

    assert_eq!(containers.len(), 3);
    assert_eq!(
        containers[0].kind,
        ContainerKind::Entity {
            implementation: "app.A".into()
        }
    );
    assert_eq!(containers[0].params.sequence(), [Definition::reference("b")]);
    assert_eq!(
        containers[1].kind,
        ContainerKind::Factorization {
            factory_id: "a".into(),
            factory_method: "make".into()
        }
    );
    assert!(containers[2].is_lambda());
    assert!(containers[1].cacheable);
    assert!(!containers[2].cacheable);
}

#[test]
fn typed_and_literal_parameters() {
    let containers = JsonParser::new()
        .parse_str(
            r#"{"containers": [{"kind": "entity", "id": "a", "class": "app.A", "params": [
                {"name": "port", "type": "int", "value": 8080},
                {"name": "host", "value": "localhost"},
                {"type": "entity", "value": "b"}
            ]}]}"#,
        )
        .unwrap();
    let params = &containers[0].params;
    assert_eq!(params.items()["port"], Definition::typed("int", "8080"));
    assert_eq!(params.items()["host"], Definition::literal(json!("localhost")));
    assert_eq!(params.sequence(), [Definition::typed("entity", "b")]);
}

#[test]
fn interception_event_and_self_reference_are_kept() {
    let containers = JsonParser::new()
        .parse_str(
            r#"{"containers": [{"kind": "entity", "id": "log", "class": "app.Log", "interceptions": [
                {"before": "me", "do": "write", "with": "stamp", "params": [{"name": "tag", "value": "x"}]}
            ]}]}"#,
        )
        .unwrap();
    let interception = &containers[0].interceptions[0];
    assert_eq!(interception.event, Event::Before);
    assert_eq!(interception.actor, "me");
    assert_eq!(interception.handler, "log");
    assert_eq!(interception.intercepted_method, "write");
    assert_eq!(interception.handling_method, "stamp");
    assert_eq!(interception.handling_params.items()["tag"], Definition::literal(json!("x")));
}

#[test]
fn duplicate_parameter_names_are_rejected() {
    let err = JsonParser::new()
        .parse_str(
            r#"{"containers": [{"kind": "entity", "id": "a", "class": "app.A", "params": [
                {"name": "x", "value": 1}, {"name": "x", "value": 2}
            ]}]}"#,
        )
        .unwrap_err();
    match err {
        AssemblyError::InContainer { id, source: CoreError::DuplicateParameter(name) } => {
            assert_eq!(id, "a");
            assert_eq!(name, "x");
        }
        other => panic!("expected DuplicateParameter, got {other:?}"),
    }
}

#[test]
fn interception_needs_exactly_one_event() {
    let parser = JsonParser::new();
    let two = r#"{"containers": [{"kind": "entity", "id": "a", "class": "app.A", "interceptions": [
        {"before": "a", "after": "a", "do": "run", "with": "log"}
    ]}]}"#;
    let none = r#"{"containers": [{"kind": "entity", "id": "a", "class": "app.A", "interceptions": [
        {"do": "run", "with": "log"}
    ]}]}"#;
    assert!(matches!(parser.parse_str(two), Err(AssemblyError::IncompatibleBlock(msg)) if msg.contains("more than one event")));
    assert!(matches!(parser.parse_str(none), Err(AssemblyError::IncompatibleBlock(msg)) if msg.contains("no event")));
}

#[test]
fn incomplete_blocks_are_rejected() {
    let parser = JsonParser::new();
    let cases = [
        r#"{"containers": [{"kind": "entity", "class": "app.A"}]}"#,
        r#"{"containers": [{"kind": "entity", "id": "a"}]}"#,
        r#"{"containers": [{"kind": "factorization", "id": "a", "with": "b"}]}"#,
        r#"{"containers": [{"kind": "widget", "id": "a"}]}"#,
        r#"{"containers": [{"kind": "entity", "id": "a", "class": "app.A", "params": [{"name": "x"}]}]}"#,
        r#"{"containers": [{"kind": "entity", "id": "a", "class": "app.A", "params": [{"ref": "b", "value": 1}]}]}"#,
        r#"{"containers": [{"kind": "entity", "id": "a", "class": "app.A"}, {"kind": "entity", "id": "a", "class": "app.B"}]}"#,
    ];
    for case in cases {
        assert!(
            matches!(parser.parse_str(case), Err(AssemblyError::IncompatibleBlock(_))),
            "accepted {case}"
        );
    }
    assert!(matches!(parser.parse_str(r#"{"containers": 3}"#), Err(AssemblyError::Json(_))));
}

#[test]
fn unsupported_and_missing_files() {
    let mut assembler = Assembler::new();
    assert!(matches!(
        assembler.load(&["services.yaml"]),
        Err(AssemblyError::UnsupportedConfigFile(path)) if path == PathBuf::from("services.yaml")
    ));

    let missing = std::env::temp_dir().join("conjure-no-such-file.json");
    assert!(matches!(assembler.load(&[missing]), Err(AssemblyError::Io { .. })));
}

#[test]
fn later_files_override_earlier_definitions() {
    let first = temp_file(
        "override-1.json",
        r#"{"containers": [{"kind": "entity", "id": "a", "class": "app.A"}, {"kind": "entity", "id": "b", "class": "app.B"}]}"#,
    );
    let second = temp_file(
        "override-2.json",
        r#"{"containers": [{"kind": "entity", "id": "a", "class": "app.Z"}]}"#,
    );
    let mut assembler = Assembler::new();
    assembler.load(&[&first, &second]).unwrap();

    let targets: Vec<_> = assembler.containers().iter().map(|c| c.kind.target()).collect();
    assert_eq!(targets, ["app.Z", "app.B"]);
    fs::remove_file(first).ok();
    fs::remove_file(second).ok();
}

#[test]
fn wiring_errors_surface_at_build() {
    let mut assembler = Assembler::new();
    assembler
        .load_json(
            r#"{"containers": [{"kind": "entity", "id": "a", "class": "app.A", "interceptions": [
                {"pre": "ghost", "do": "run", "with": "log"}
            ]}]}"#,
        )
        .unwrap();
    let err = assembler.build(Arc::new(SymbolTable::new())).unwrap_err();
    assert!(matches!(err, AssemblyError::Core(CoreError::UnknownContainer(id)) if id == "ghost"));
}

#[test]
fn assembled_registry_activates_and_intercepts() {
    let path = temp_file("bakery.json", BAKERY);
    let mut assembler = Assembler::new();
    assembler.load(&[&path]).unwrap();
    let registry = assembler.build(Arc::new(bakery())).unwrap();

    let bread = registry.get("bread").unwrap();
    assert_eq!(bread.as_data(), Some(&json!("bread at 220 *ding*")));
    assert_eq!(registry.get_interceptions("oven").len(), 1);
    assert!(registry.activated("timer").unwrap());
    assert!(!registry.activated("bread").unwrap());
    fs::remove_file(path).ok();
}

/// `id class` per line.
struct ListParser;

impl ConfigParser for ListParser {
    fn can_handle(&self, path: &Path) -> bool {
        path.extension().and_then(|ext| ext.to_str()) == Some("list")
    }

    fn parse(&self, path: &Path) -> Result<Vec<ContainerMeta>, AssemblyError> {
        let text = fs::read_to_string(path).map_err(|source| AssemblyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(text
            .lines()
            .filter_map(|line| line.trim().split_once(' '))
            .map(|(id, class)| ContainerMeta::entity(id, class.trim()))
            .collect())
    }
}

#[test]
fn extra_parsers_handle_their_own_files() {
    let list = temp_file("extra.list", "mailer app.Mailer\nqueue app.Queue\n");
    let json = temp_file(
        "extra.json",
        r#"{"containers": [{"kind": "entity", "id": "queue", "class": "app.FastQueue"}]}"#,
    );

    assert!(matches!(
        Assembler::new().load(&[&list]),
        Err(AssemblyError::UnsupportedConfigFile(_))
    ));

    let mut assembler = Assembler::new().with_parser(Box::new(ListParser));
    assembler.load(&[&list, &json]).unwrap();
    let loaded: Vec<_> = assembler
        .containers()
        .iter()
        .map(|c| (c.id.as_str(), c.kind.target()))
        .collect();
    assert_eq!(
        loaded,
        [("mailer", "app.Mailer".to_string()), ("queue", "app.FastQueue".to_string())]
    );
    fs::remove_file(list).ok();
    fs::remove_file(json).ok();
}

/// Upper-cases every string the default transformer produces.
struct Shouting;

impl Transformer for Shouting {
    fn cast(&self, definition: &Definition, locator: &dyn Locator) -> Result<Value, CoreError> {
        let value = TypeTransformer.cast(definition, locator)?;
        let upper = value.as_data().and_then(|v| v.as_str()).map(str::to_uppercase);
        Ok(match upper {
            Some(s) => json!(s).into(),
            None => value,
        })
    }
}

#[test]
fn custom_transformer_casts_parameters() {
    let mut assembler = Assembler::new().with_transformer(Arc::new(Shouting));
    assembler.load_json(BAKERY).unwrap();
    let registry = assembler.build(Arc::new(bakery())).unwrap();
    assert_eq!(
        registry.get("bread").unwrap().as_data(),
        Some(&json!("BREAD at 220 *ding*"))
    );
}

/// `{"kind": "service", "class": "Mailer"}` resolves under the `svc.` namespace.
struct ServiceCreator;

impl ContainerCreator for ServiceCreator {
    fn can_handle(&self, kind: &str) -> bool {
        kind == "service"
    }

    fn create(&self, id: &str, node: &ContainerNode, params: ParameterCollection) -> Result<ContainerMeta, AssemblyError> {
        let class = node
            .class
            .as_deref()
            .ok_or_else(|| AssemblyError::IncompatibleBlock(format!("service {} has no class", id)))?;
        Ok(ContainerMeta::entity(id, &format!("svc.{}", class)).with_params(params))
    }
}

#[test]
fn extra_creators_handle_new_kinds() {
    let document = r#"{"containers": [{"kind": "service", "id": "mail", "class": "Mailer"}]}"#;
    assert!(matches!(
        JsonParser::new().parse_str(document),
        Err(AssemblyError::IncompatibleBlock(msg)) if msg.contains("unknown kind")
    ));

    let containers = JsonParser::new()
        .with_creator(Box::new(ServiceCreator))
        .parse_str(document)
        .unwrap();
    assert_eq!(
        containers[0].kind,
        ContainerKind::Entity {
            implementation: "svc.Mailer".into()
        }
    );
}

#[test]
fn no_interruption_forbids_intercepting_the_entity() {
    let mut assembler = Assembler::new();
    assembler
        .load_json(
            r#"{"containers": [
                {"kind": "entity", "id": "vault", "class": "app.Vault", "no_interruption": true},
                {"kind": "entity", "id": "spy", "class": "app.Spy", "interceptions": [
                    {"pre": "vault", "do": "open", "with": "peek"}
                ]}
            ]}"#,
        )
        .unwrap();
    assert!(!assembler.containers()[0].interceptable);
    assert!(assembler.containers()[1].interceptable);

    let err = assembler.build(Arc::new(SymbolTable::new())).unwrap_err();
    assert!(matches!(err, AssemblyError::Core(CoreError::NotInterceptable(id)) if id == "vault"));
}
