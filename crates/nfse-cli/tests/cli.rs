//! Integration tests for the nfse binary.

use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// CLI command isolated from the user's configuration.
fn cli(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_nfse"));
    cmd.env("HOME", home).env("XDG_CONFIG_HOME", home.join(".config"));
    cmd
}

fn invoice_xml(number: &str, description: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <CompNfse xmlns=\"http://www.abrasf.org.br/nfse.xsd\"><Nfse><InfNfse>\
         <Numero>{}</Numero>\
         <DataEmissao>2024-03-05</DataEmissao>\
         <Competencia>2024-03-01</Competencia>\
         <Servico><Valores><ValorServicos>1234.56</ValorServicos></Valores>\
         <Discriminacao>{}</Discriminacao></Servico>\
         </InfNfse></Nfse></CompNfse>",
        number, description
    )
}

fn template_docx() -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    writer.start_file("[Content_Types].xml", options).unwrap();
    writer
        .write_all(b"<?xml version=\"1.0\"?><Types/>")
        .unwrap();
    writer.start_file("word/document.xml", options).unwrap();
    writer
        .write_all(
            b"<w:document><w:body><w:p><w:r><w:t>NF {{numeroNF}} - {{valor}}</w:t></w:r></w:p>\
              <w:p><w:r><w:t>{{valor_extenso}}</w:t></w:r></w:p></w:body></w:document>",
        )
        .unwrap();

    writer.finish().unwrap().into_inner()
}

/// Template library with both roles for one Maracanaú category.
fn template_library(root: &Path) {
    let category = root.join("MARACANAU").join("MARACANAU_EDUCACAO");
    fs::create_dir_all(&category).unwrap();
    fs::write(category.join("Planilha.docx"), template_docx()).unwrap();
    fs::write(category.join("Relatorio.docx"), template_docx()).unwrap();
}

fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Vec<u8> {
    let mut bytes = Vec::new();
    archive
        .by_name(name)
        .unwrap()
        .read_to_end(&mut bytes)
        .unwrap();
    bytes
}

#[test]
fn test_help() {
    let home = TempDir::new().unwrap();
    cli(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn test_process_builds_archive() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let input = work.path().join("notas");
    let templates = work.path().join("modelos");
    fs::create_dir_all(&input).unwrap();
    template_library(&templates);

    fs::write(
        input.join("nota_1.xml"),
        invoice_xml("42", "SERVIÇOS DE EDUCAÇÃO EM PAPEL"),
    )
    .unwrap();
    fs::write(input.join("nota_2.xml"), invoice_xml("43", "Consultoria")).unwrap();
    fs::write(input.join("leia-me.txt"), "ignorado").unwrap();

    let output = work.path().join("saida.zip");

    cli(home.path())
        .arg("process")
        .arg(&input)
        .args(["--client", "maracanau"])
        .arg("--templates")
        .arg(&templates)
        .arg("-o")
        .arg(&output)
        .arg("--summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("Processing 2 files"))
        .stdout(predicate::str::contains("Generated 2 documents"))
        .stdout(predicate::str::contains("nota_2.xml: no matching category"));

    let bytes = fs::read(&output).unwrap();
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["nota_1_Planilha.docx", "nota_1_Relatorio.docx"]);

    let docx = read_entry(&mut archive, "nota_1_Planilha.docx");
    let mut docx = ZipArchive::new(Cursor::new(docx)).unwrap();
    let body = String::from_utf8(read_entry(&mut docx, "word/document.xml")).unwrap();
    assert!(body.contains("NF 42 - R$ 1.234,56"));
    assert!(body.contains("Mil duzentos e trinta e quatro reais e cinquenta e seis centavos"));

    let summary = fs::read_to_string(work.path().join("summary.csv")).unwrap();
    assert!(summary.starts_with("filename,status,category,outputs,reason,warnings"));
    assert!(summary.contains("nota_1.xml,rendered,MARACANAU_EDUCACAO"));
    assert!(summary.contains("nota_2.xml,skipped"));
}

#[test]
fn test_process_nothing_processed() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let templates = work.path().join("modelos");
    template_library(&templates);

    let input = work.path().join("nota.xml");
    fs::write(&input, invoice_xml("1", "Consultoria")).unwrap();
    let output = work.path().join("saida.zip");

    cli(home.path())
        .arg("process")
        .arg(&input)
        .args(["--client", "MARACANAU"])
        .arg("--templates")
        .arg(&templates)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing processed"));

    assert!(!output.exists());
}

#[test]
fn test_process_unknown_client() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("nota.xml"), invoice_xml("1", "PAPEL")).unwrap();

    cli(home.path())
        .arg("process")
        .arg(work.path())
        .args(["--client", "fortaleza"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown client: fortaleza"))
        .stderr(predicate::str::contains("MARACANAU, PACATUBA"));
}

#[test]
fn test_process_malformed_input_is_skipped() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let input = work.path().join("notas");
    let templates = work.path().join("modelos");
    fs::create_dir_all(&input).unwrap();
    template_library(&templates);

    fs::write(input.join("a.xml"), "<InfNfse><Numero>").unwrap();
    fs::write(input.join("b.xml"), invoice_xml("7", "EDUCAÇÃO PAPEL")).unwrap();
    let output = work.path().join("saida.zip");

    cli(home.path())
        .arg("process")
        .arg(&input)
        .args(["--client", "maracanau"])
        .arg("--templates")
        .arg(&templates)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("a.xml: malformed XML"))
        .stdout(predicate::str::contains("Generated 2 documents"));

    assert!(output.exists());
}

#[test]
fn test_process_same_file_name_in_subdirectories() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let input = work.path().join("notas");
    let templates = work.path().join("modelos");
    template_library(&templates);

    for (dir, number) in [("janeiro", "1"), ("fevereiro", "2")] {
        fs::create_dir_all(input.join(dir)).unwrap();
        fs::write(
            input.join(dir).join("nota.xml"),
            invoice_xml(number, "EDUCAÇÃO PAPEL"),
        )
        .unwrap();
    }
    let output = work.path().join("saida.zip");
    let pattern = format!("{}/**/*.xml", input.display());

    cli(home.path())
        .arg("process")
        .arg(&pattern)
        .args(["--client", "maracanau"])
        .arg("--templates")
        .arg(&templates)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated 4 documents"));

    let bytes = fs::read(&output).unwrap();
    let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "nota_Planilha.docx",
            "nota_Planilha_2.docx",
            "nota_Relatorio.docx",
            "nota_Relatorio_2.docx",
        ]
    );
}

#[test]
fn test_inspect_json() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let input = work.path().join("nota.xml");
    fs::write(&input, invoice_xml("42", "10 R$ 5,00 EDUCAÇÃO PAPEL")).unwrap();

    cli(home.path())
        .arg("inspect")
        .arg(&input)
        .args(["--client", "maracanau"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"numeroNF\": \"42\""))
        .stdout(predicate::str::contains("\"data\": \"5 de Março de 2024\""))
        .stdout(predicate::str::contains("\"competencia\": \"Março 2024\""))
        .stdout(predicate::str::contains("\"quant\": \"10\""))
        .stdout(predicate::str::contains("\"category\": \"MARACANAU_EDUCACAO\""))
        .stdout(predicate::str::contains("\"processing_time_ms\""));
}

#[test]
fn test_inspect_text_zero_amount() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let input = work.path().join("nota.xml");
    fs::write(
        &input,
        "<InfNfse><Numero>9</Numero><ValorServicos>0.00</ValorServicos></InfNfse>",
    )
    .unwrap();

    cli(home.path())
        .arg("inspect")
        .arg(&input)
        .args(["--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Amount:       N/A"))
        .stdout(predicate::str::contains("In words:     N/A"))
        .stdout(predicate::str::contains("Extracted in"));
}

#[test]
fn test_inspect_missing_section_fails() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let input = work.path().join("nota.xml");
    fs::write(&input, "<Nfse><Numero>1</Numero></Nfse>").unwrap();

    cli(home.path())
        .arg("inspect")
        .arg(&input)
        .assert()
        .failure();
}

#[test]
fn test_config_init_and_get() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("nfse.json");

    cli(home.path())
        .args(["config", "init", "-o"])
        .arg(&config)
        .assert()
        .success();
    assert!(config.exists());

    cli(home.path())
        .arg("-c")
        .arg(&config)
        .args(["config", "get", "output.archive_prefix"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"documentos\""));
}

#[test]
fn test_clients_lists_rules() {
    let home = TempDir::new().unwrap();

    cli(home.path())
        .arg("clients")
        .assert()
        .success()
        .stdout(predicate::str::contains("MARACANAU"))
        .stdout(predicate::str::contains("PACATUBA"));
}
