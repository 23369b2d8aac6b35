//! Offline gospel corpus used when every source fails.
//!
//! Selection is a pure function of the calendar date: the seed
//! `year * 10000 + month * 100 + day` modulo the corpus size picks the
//! passage, so the same day always shows the same reading, across calls and
//! across restarts. Within a month the choice repeats every `len()` days.

use chrono::{Datelike, NaiveDate};

use crate::error::GospelError;
use crate::models::GospelRecord;

/// Date-derived selection seed.
pub fn seed(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 10_000 + i64::from(date.month()) * 100 + i64::from(date.day())
}

/// An ordered, immutable table of fallback passages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackCorpus {
    entries: Vec<GospelRecord>,
}

impl FallbackCorpus {
    /// A corpus built from configured passages. An empty corpus is accepted
    /// here and reported by [`FallbackCorpus::for_date`].
    pub fn new(entries: Vec<GospelRecord>) -> Self {
        Self { entries }
    }

    /// The seven passages shipped with the crate.
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN
                .iter()
                .map(|(reference, text)| GospelRecord::from_static(reference, text))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the passage assigned to `date`.
    pub fn index_for(&self, date: NaiveDate) -> Result<usize, GospelError> {
        if self.entries.is_empty() {
            return Err(GospelError::EmptyCorpus);
        }
        Ok(seed(date).rem_euclid(self.entries.len() as i64) as usize)
    }

    /// The passage assigned to `date`.
    ///
    /// # Returns
    ///
    /// The entry at [`seed`]`(date)` modulo the corpus length.
    ///
    /// # Errors
    ///
    /// [`GospelError::EmptyCorpus`] if the corpus has no entries.
    pub fn for_date(&self, date: NaiveDate) -> Result<&GospelRecord, GospelError> {
        let index = self.index_for(date)?;
        Ok(&self.entries[index])
    }
}

impl Default for FallbackCorpus {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Built-in passage for `date`.
pub fn fallback_for_date(date: NaiveDate) -> GospelRecord {
    let index = (seed(date).rem_euclid(BUILTIN.len() as i64)) as usize;
    let (reference, text) = BUILTIN[index];
    GospelRecord::from_static(reference, text)
}

const BUILTIN: [(&str, &str); 7] = [
    (
        "Evangelho segundo São João (Jo 14,1-6)",
        r#"Naquele tempo, disse Jesus aos seus discípulos:

"Não se perturbe o vosso coração. Tendes fé em Deus, tende fé também em mim. Na casa de meu Pai há muitas moradas. Se assim não fosse, eu vos teria dito. Vou preparar-vos um lugar. E quando eu for e vos preparar um lugar, voltarei e vos levarei comigo, para que, onde eu estou, estejais também vós. E vós conheceis o caminho para onde eu vou."

Disse-lhe Tomé: "Senhor, não sabemos para onde vais. Como podemos conhecer o caminho?"

Respondeu-lhe Jesus: "Eu sou o Caminho, a Verdade e a Vida. Ninguém vem ao Pai senão por mim."

— Palavra da Salvação.
— Glória a vós, Senhor."#,
    ),
    (
        "Evangelho segundo São Lucas (Lc 5,33-39)",
        r#"Naquele tempo, os fariseus e os mestres da Lei disseram a Jesus: "Os discípulos de João, e também os discípulos dos fariseus, jejuam com frequência e fazem orações. Mas os teus discípulos comem e bebem".

Jesus, porém, lhes disse: "Os convidados de um casamento podem fazer jejum enquanto o noivo está com eles? Mas dias virão em que o noivo será tirado do meio deles. Então, naqueles dias, eles jejuarão".

Jesus contou-lhes ainda uma parábola: "Ninguém tira retalho de roupa nova para fazer remendo em roupa velha; senão vai rasgar a roupa nova, e o retalho novo não combinará com a roupa velha. Ninguém coloca vinho novo em odres velhos; porque, senão, o vinho novo arrebenta os odres velhos e se derrama; e os odres se perdem. Vinho novo deve ser colocado em odres novos. E ninguém, depois de beber vinho velho, deseja vinho novo; porque diz: o velho é melhor".

— Palavra da Salvação.
— Glória a vós, Senhor."#,
    ),
    (
        "Evangelho segundo São Mateus (Mt 5,1-12)",
        r#"Naquele tempo, vendo Jesus as multidões, subiu ao monte. Sentou-se e os discípulos aproximaram-se dele. Então começou a ensiná-los, dizendo:

"Bem-aventurados os pobres em espírito, porque deles é o Reino dos Céus.
Bem-aventurados os que choram, porque serão consolados.
Bem-aventurados os mansos, porque herdarão a terra.
Bem-aventurados os que têm fome e sede de justiça, porque serão saciados.
Bem-aventurados os misericordiosos, porque alcançarão misericórdia.
Bem-aventurados os puros de coração, porque verão a Deus.
Bem-aventurados os pacificadores, porque serão chamados filhos de Deus.
Bem-aventurados os que são perseguidos por causa da justiça, porque deles é o Reino dos Céus.
Bem-aventurados sois quando vos injuriarem e vos perseguirem e, mentindo, disserem todo mal contra vós por causa de mim.
Alegrai-vos e exultai, porque é grande a vossa recompensa nos céus."

— Palavra da Salvação.
— Glória a vós, Senhor."#,
    ),
    (
        "Evangelho segundo São Lucas (Lc 10,38-42)",
        r#"Naquele tempo, Jesus entrou num povoado, e certa mulher, de nome Marta, recebeu-o em sua casa. Sua irmã chamava-se Maria. Esta sentou-se aos pés do Senhor e ficou escutando a sua palavra. Marta agitava-se de um lado para outro, ocupada com muitos serviços.

Então aproximou-se e disse: "Senhor, não te importas que minha irmã me deixe sozinha com o serviço? Manda que ela venha ajudar-me!"

O Senhor, porém, lhe respondeu: "Marta, Marta! Tu te preocupas e andas agitada por muitas coisas. Porém, uma só é necessária. Maria escolheu a melhor parte e esta não lhe será tirada."

— Palavra da Salvação.
— Glória a vós, Senhor."#,
    ),
    (
        "Evangelho segundo São João (Jo 3,16-21)",
        r#"Naquele tempo, disse Jesus a Nicodemos:

"Deus amou tanto o mundo, que entregou o seu Filho único, para que todo o que nele crer não pereça, mas tenha a vida eterna. De fato, Deus não enviou o seu Filho ao mundo para condenar o mundo, mas para que o mundo seja salvo por ele. Quem nele crê, não é condenado; quem não crê, já está condenado, porque não acreditou no nome do Filho único de Deus.

Ora, o julgamento é este: a luz veio ao mundo, mas os homens preferiram as trevas à luz, porque suas ações eram más. Quem pratica o mal odeia a luz e não se aproxima da luz, para que suas ações não sejam denunciadas. Mas quem age conforme a verdade aproxima-se da luz, para que se torne claro que suas ações são realizadas em Deus."

— Palavra da Salvação.
— Glória a vós, Senhor."#,
    ),
    (
        "Evangelho segundo São Marcos (Mc 12,28-34)",
        r#"Naquele tempo, aproximou-se de Jesus um dos escribas que os tinha ouvido discutir. Vendo como Jesus havia respondido bem, perguntou-lhe: "Qual é o primeiro de todos os mandamentos?"

Jesus respondeu: "O primeiro é este: 'Ouve, ó Israel! O Senhor, nosso Deus, é o único Senhor. Amarás o Senhor, teu Deus, de todo o teu coração, de toda a tua alma, de todo o teu entendimento e com toda a tua força'. O segundo é este: 'Amarás o teu próximo como a ti mesmo'. Não existe outro mandamento maior do que estes."

O escriba disse a Jesus: "Muito bem, Mestre! Na verdade disseste que ele é único e não há outro além dele; e que amá-lo de todo o coração, de todo o entendimento e com toda a força, e amar o próximo como a si mesmo vale mais do que todos os holocaustos e sacrifícios."

Jesus, vendo que ele havia respondido sabiamente, disse-lhe: "Tu não estás longe do Reino de Deus". E ninguém mais ousava fazer-lhe perguntas.

— Palavra da Salvação.
— Glória a vós, Senhor."#,
    ),
    (
        "Evangelho segundo São Lucas (Lc 6,20-26)",
        r#"Naquele tempo, Jesus, erguendo os olhos para os seus discípulos, disse:

"Bem-aventurados vós, os pobres, porque vosso é o Reino de Deus!
Bem-aventurados vós, que agora tendes fome, porque sereis saciados!
Bem-aventurados vós, que agora chorais, porque havereis de rir!
Bem-aventurados sereis quando os homens vos odiarem, quando vos expulsarem, vos injuriarem e proscreverem vosso nome como infame, por causa do Filho do Homem! Alegrai-vos nesse dia e exultai, porque grande é a vossa recompensa no céu.

Mas ai de vós, ricos, porque já tendes a vossa consolação!
Ai de vós, que estais saciados, porque tereis fome!
Ai de vós, que agora rides, porque gemereis e chorareis!
Ai de vós, quando todos os homens vos louvarem! Do mesmo modo seus pais tratavam os falsos profetas."

— Palavra da Salvação.
— Glória a vós, Senhor."#,
    ),
];
