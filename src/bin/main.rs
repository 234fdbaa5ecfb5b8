fn main() {
  pin::main()
}
