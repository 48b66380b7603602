use colored::*;

pub fn print_logo() {
    let logo = r#"
 __        __            _
 \ \      / /_ _ _ __ __| | ___ _ __
  \ \ /\ / / _` | '__/ _` |/ _ \ '_ \
   \ V  V / (_| | | | (_| |  __/ | | |
    \_/\_/ \__,_|_|  \__,_|\___|_| |_|
"#;
    println!("{}", logo.cyan().bold());
    println!(
        "{}",
        "      Stateful Invariant Fuzzing for Token Ledgers"
            .white()
            .italic()
    );
    println!("{}", "      v0.1.0 | Break it before mainnet does".dimmed());
    println!();
}
