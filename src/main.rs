use bytevm::run_suite;

fn main() {
    print!("{}", run_suite());
}
