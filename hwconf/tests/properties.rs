use hwconf::catalog::{Catalog, ParamSpec, PeripheralKind, PeripheralSpec, Roles};
use hwconf::errors::ViolationKind;
use hwconf::{check_target, emit, Origin, ParamType, PinId, Resolver, Source, SourceStack, Tier, Validator, Value, Violation};
use std::sync::Arc;

/// The five-parameter catalog of the EdgeBox bring-up
fn edgebox_catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::from_params(vec![
            ParamSpec::new("BOARD_NAME", ParamType::String),
            ParamSpec::new("MCU_NAME", ParamType::String).mandatory(),
            ParamSpec::new("I2C0_SCL", ParamType::Pin),
            ParamSpec::new("I2C0_SDA", ParamType::Pin),
            ParamSpec::new("HOSTNAME_DEFAULT", ParamType::String),
        ])
        .unwrap(),
    )
}

fn edgebox_stack() -> SourceStack {
    SourceStack::new()
        .with(Source::new(Tier::Default, "global").define("MCU_NAME", "GENERIC"))
        .with(
            Source::new(Tier::Board, "SEEED_EDGEBOX_ESP100")
                .define("BOARD_NAME", "Seeed EdgeBox ESP-100")
                .define("MCU_NAME", "ESP32S3")
                .define("I2C0_SCL", 19)
                .define("I2C0_SDA", 20)
                .define("HOSTNAME_DEFAULT", "Seeed-EdgeBox"),
        )
}

/// Two buses whose pins can be made to collide
fn bus_catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::new(
            1,
            Roles::default(),
            vec![
                ParamSpec::new("I2C0_SCL", ParamType::Pin),
                ParamSpec::new("I2C0_SDA", ParamType::Pin),
                ParamSpec::new("SPI1_SCK", ParamType::Pin),
            ],
            vec![
                PeripheralSpec::new("i2c0", PeripheralKind::I2c)
                    .pin("scl", "I2C0_SCL")
                    .pin("sda", "I2C0_SDA"),
                PeripheralSpec::new("spi1", PeripheralKind::Spi).pin("sck", "SPI1_SCK"),
            ],
        )
        .unwrap(),
    )
}

#[test]
fn test_edgebox_end_to_end() {
    let resolver = Resolver::new(edgebox_catalog());
    let checked = check_target(&resolver, &edgebox_stack()).unwrap();
    let config = &checked.config;

    assert_eq!(config.get_string("BOARD_NAME"), Some("Seeed EdgeBox ESP-100"));
    assert_eq!(config.get_string("MCU_NAME"), Some("ESP32S3"));
    assert_eq!(config.get_pin("I2C0_SCL"), Some(PinId(19)));
    assert_eq!(config.get_pin("I2C0_SDA"), Some(PinId(20)));
    assert_eq!(config.get_string("HOSTNAME_DEFAULT"), Some("Seeed-EdgeBox"));
    assert_eq!(
        config.binding("BOARD_NAME").map(|b| &b.origin),
        Some(&Origin::Source {
            tier: Tier::Board,
            name: "SEEED_EDGEBOX_ESP100".into()
        })
    );

    // the board hides the default MCU name
    assert_eq!(checked.notes.len(), 1);
    assert_eq!(checked.notes[0].param, "MCU_NAME");
    assert!(!checked.notes[0].redundant);
}

#[test]
fn test_precedence_is_transitive() {
    let catalog = Arc::new(Catalog::from_params(vec![ParamSpec::new("X", ParamType::Integer)]).unwrap());
    let resolver = Resolver::new(catalog);

    let default = Source::new(Tier::Default, "global").define("X", 1);
    let port = Source::new(Tier::Port, "esp32").define("X", 2);
    let board = Source::new(Tier::Board, "B").define("X", 3);

    let full = SourceStack::new().with(default.clone()).with(port.clone()).with(board);
    assert_eq!(resolver.resolve(&full).unwrap().get_integer("X"), Some(3));

    let no_board = SourceStack::new()
        .with(default.clone())
        .with(port)
        .with(Source::new(Tier::Board, "B"));
    assert_eq!(resolver.resolve(&no_board).unwrap().get_integer("X"), Some(2));

    let only_default = SourceStack::new().with(default).with(Source::new(Tier::Board, "B"));
    assert_eq!(resolver.resolve(&only_default).unwrap().get_integer("X"), Some(1));
}

#[test]
fn test_resolution_is_idempotent() {
    let resolver = Resolver::new(edgebox_catalog());
    let stack = edgebox_stack();
    let first = resolver.resolve(&stack).unwrap();
    let second = resolver.resolve(&stack).unwrap();

    assert_eq!(first, second);
    assert_eq!(emit::json(&first).unwrap(), emit::json(&second).unwrap());
}

#[test]
fn test_missing_mandatory_is_the_only_violation() {
    let resolver = Resolver::new(edgebox_catalog());
    let stack = SourceStack::new().with(Source::new(Tier::Board, "B").define("I2C0_SCL", 19));

    let violations = check_target(&resolver, &stack).unwrap_err();
    assert_eq!(violations.kinds(), vec![ViolationKind::MissingMandatoryParameter]);
    assert_eq!(
        violations.iter().next(),
        Some(&Violation::MissingMandatoryParameter {
            name: "MCU_NAME".into()
        })
    );
}

#[test]
fn test_pin_conflict_names_both_claimants() {
    let resolver = Resolver::new(bus_catalog());
    let stack = SourceStack::new().with(
        Source::new(Tier::Board, "B")
            .define("I2C0_SCL", 5)
            .define("I2C0_SDA", 6)
            .define("SPI1_SCK", 5),
    );

    let violations = check_target(&resolver, &stack).unwrap_err();
    assert_eq!(violations.len(), 1);
    let conflict = violations.iter().next();
    match conflict {
        Some(Violation::PinConflict { pin, first, second }) => {
            assert_eq!(*pin, PinId(5));
            assert_eq!(first.peripheral.as_deref(), Some("i2c0"));
            assert_eq!(second.peripheral.as_deref(), Some("spi1"));
            assert_eq!(second.param, "SPI1_SCK");
        }
        other => panic!("unexpected violation: {other:?}"),
    }
}

#[test]
fn test_disjoint_pins_validate() {
    let resolver = Resolver::new(bus_catalog());
    let stack = SourceStack::new().with(
        Source::new(Tier::Board, "B")
            .define("I2C0_SCL", 5)
            .define("I2C0_SDA", 6)
            .define("SPI1_SCK", 7),
    );
    let resolved = resolver.resolve(&stack).unwrap();
    assert!(Validator::check(&resolved).is_empty());
}

#[test]
fn test_unknown_name_rejected_when_all_else_resolves() {
    let resolver = Resolver::new(edgebox_catalog());
    let mut stack = edgebox_stack();
    stack.push(Source::new(Tier::User, "command-line").define("MICROPY_HW_TYPO", Value::from(true)));

    let violations = check_target(&resolver, &stack).unwrap_err();
    assert_eq!(violations.kinds(), vec![ViolationKind::UnknownParameterName]);
    assert!(resolver.resolve(&stack).is_err());
}
