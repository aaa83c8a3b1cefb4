use super::*;

#[test]
fn parses_pools_command() {
    let cli = Cli::try_parse_from(["parkdb-cli", "pools"]).expect("expected valid cli args");

    assert!(matches!(cli.command, Commands::Pools));
}

#[test]
fn parses_lot_infos_without_source() {
    let cli = Cli::try_parse_from(["parkdb-cli", "lot-infos"]).expect("expected valid cli args");

    assert!(matches!(cli.command, Commands::LotInfos { source: None }));
}

#[test]
fn parses_lot_infos_with_source() {
    let cli = Cli::try_parse_from(["parkdb-cli", "lot-infos", "--source", "neckarsulm"])
        .expect("expected valid cli args");

    match cli.command {
        Commands::LotInfos { source } => assert_eq!(source.as_deref(), Some("neckarsulm")),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parses_lot_data_with_source() {
    let cli = Cli::try_parse_from(["parkdb-cli", "lot-data", "--source", "bahn"])
        .expect("expected valid cli args");

    match cli.command {
        Commands::LotData { source } => assert_eq!(source.as_deref(), Some("bahn")),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn missing_command_is_rejected() {
    assert!(Cli::try_parse_from(["parkdb-cli"]).is_err());
}

#[test]
fn unknown_command_is_rejected() {
    assert!(Cli::try_parse_from(["parkdb-cli", "collect"]).is_err());
}
