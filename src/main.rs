use std::io::{self, BufRead, IsTerminal, Write};

use schemer::Interpreter;

fn main() {
    let mut interp = Interpreter::new();
    let interactive = io::stdin().is_terminal();

    if interactive {
        println!("schemer: one expression per line");
    }

    repl(&mut interp, interactive);
}

/// Accumulate lines until parens are balanced, then evaluate the buffer as
/// one expression. Naive depth counting, sufficient for well-formed input.
fn repl(interp: &mut Interpreter, interactive: bool) {
    let stdin = io::stdin();
    let mut buf = String::new();
    let mut depth: i32 = 0;

    loop {
        if interactive {
            if depth == 0 {
                print!("> ");
            } else {
                print!("  ");
            }
            let _ = io::stdout().flush();
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("read error: {}", e);
                break;
            }
        }

        for ch in line.chars() {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
        }

        buf.push_str(&line);

        if depth <= 0 {
            depth = 0;
            let input = buf.trim().to_string();
            buf.clear();

            if input.is_empty() {
                continue;
            }

            match interp.run(&input) {
                Ok(result) => println!("{}", result),
                Err(e) => eprintln!("{}", e),
            }
        }
    }
}
