use colored::*;
use warden_core::invariants::BUILTIN;
use warden_core::ActionKind;

pub fn exec() {
    println!("{}", "Actions".bold());
    for action in ActionKind::ALL {
        println!("   {}({})", action.name().cyan(), action.parameters().join(", "));
    }

    println!("\n{}", "Invariants".bold());
    for (name, description) in BUILTIN {
        println!("   {:<24} {}", name.cyan(), description);
    }
}
